// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Command Serialization
//!
//! The one place where structured `StageCommand`s are flattened: either
//! into a `std::process::Command` (no shell involved) or into a quoted
//! shell string for the chunk-splitter's `--filter`, which GNU split runs
//! through `$SHELL -c` with `$FILE` set per chunk.

use crate::domain::command::{Arg, DestinationTemplate, StageCommand, CHUNK_PLACEHOLDER};
use crate::domain::errors::{ExportError, Result};
use std::process::Command;

/// Resolves GNU coreutils names; macOS ships them with a `g` prefix.
pub fn gnu_tool(name: &str) -> String {
    if cfg!(target_os = "macos") {
        format!("g{}", name)
    } else {
        name.to_string()
    }
}

/// Fails with `ExecutableNotFoundError` for the first program not on PATH.
pub fn require_executables<'a, I>(programs: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    for program in programs {
        which::which(program)
            .map_err(|_| ExportError::ExecutableNotFoundError(program.to_string()))?;
    }
    Ok(())
}

fn quote(word: &str) -> Result<String> {
    shlex::try_quote(word)
        .map(|q| q.into_owned())
        .map_err(|e| ExportError::CommandError(format!("cannot quote {:?}: {}", word, e)))
}

fn render_destination(dest: &DestinationTemplate) -> Result<String> {
    // Quoted literal parts around an unquoted, double-quoted "$FILE".
    let mut out = quote(&dest.base)?;
    out.push('"');
    out.push_str(CHUNK_PLACEHOLDER);
    out.push('"');
    if !dest.extension.is_empty() {
        out.push_str(&quote(&dest.extension)?);
    }
    Ok(out)
}

fn render_arg(arg: &Arg) -> Result<String> {
    match arg {
        Arg::Literal(s) => quote(s),
        Arg::Destination(dest) => render_destination(dest),
        Arg::Filter(chain) => quote(&render_chain(chain)?),
    }
}

/// Renders one command as a shell string.
pub fn render_command(cmd: &StageCommand) -> Result<String> {
    let mut words = vec![quote(&cmd.program)?];
    for arg in &cmd.args {
        words.push(render_arg(arg)?);
    }
    if let Some(target) = &cmd.stdout_to {
        words.push(">".to_string());
        words.push(render_arg(target)?);
    }
    Ok(words.join(" "))
}

/// Renders `a | b | c`.
pub fn render_chain(chain: &[StageCommand]) -> Result<String> {
    let rendered = chain
        .iter()
        .map(render_command)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(" | "))
}

/// Builds a directly executable `Command`; destinations and redirects need a shell.
pub fn to_command(cmd: &StageCommand) -> Result<Command> {
    if cmd.stdout_to.is_some() {
        return Err(ExportError::CommandError(format!(
            "{} redirects stdout and must run inside a filter",
            cmd.program
        )));
    }
    let mut command = Command::new(&cmd.program);
    for arg in &cmd.args {
        match arg {
            Arg::Literal(s) => {
                command.arg(s);
            }
            Arg::Filter(chain) => {
                command.arg(render_chain(chain)?);
            }
            Arg::Destination(dest) => {
                return Err(ExportError::CommandError(format!(
                    "destination {} can only be resolved inside a filter",
                    dest
                )))
            }
        }
    }
    Ok(command)
}

/// Human-readable form for logs, with anything after `-P` masked.
pub fn display_command(cmd: &StageCommand) -> String {
    let mut words = vec![cmd.program.clone()];
    let mut mask_next = false;
    for arg in &cmd.args {
        let word = match arg {
            Arg::Literal(_) if mask_next => {
                mask_next = false;
                "****".to_string()
            }
            Arg::Literal(s) => {
                mask_next = s == "-P";
                s.clone()
            }
            Arg::Destination(dest) => dest.to_string(),
            Arg::Filter(chain) => format!(
                "'{}'",
                chain
                    .iter()
                    .map(display_command)
                    .collect::<Vec<_>>()
                    .join(" | ")
            ),
        };
        words.push(word);
    }
    if let Some(target) = &cmd.stdout_to {
        words.push(">".to_string());
        words.push(match target {
            Arg::Literal(s) => s.clone(),
            Arg::Destination(dest) => dest.to_string(),
            Arg::Filter(_) => "<filter>".to_string(),
        });
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn sh(script: &str, file_var: &str) -> String {
        let out = StdCommand::new("sh")
            .arg("-c")
            .arg(script)
            .env("FILE", file_var)
            .output()
            .unwrap();
        assert!(out.status.success(), "script failed: {}", script);
        String::from_utf8(out.stdout).unwrap()
    }

    #[test]
    fn test_render_quotes_literals() {
        let cmd = StageCommand::new("printf")
            .arg("%s|%s")
            .arg("it's a test")
            .arg("$HOME");
        let script = render_command(&cmd).unwrap();
        assert_eq!(sh(&script, ""), "it's a test|$HOME");
    }

    #[test]
    fn test_render_destination_expands_placeholder() {
        let dest = DestinationTemplate::new("/tmp/dir with space", ".json.gz");
        let cmd = StageCommand::new("printf")
            .arg("%s")
            .arg(Arg::Destination(dest));
        let script = render_command(&cmd).unwrap();
        assert_eq!(
            sh(&script, "part-00000003"),
            "/tmp/dir with space/part-00000003.json.gz"
        );
    }

    #[test]
    fn test_render_chain_and_redirect() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = DestinationTemplate::new(tmp.path().to_str().unwrap(), ".txt");
        let chain = vec![
            StageCommand::new("tr").arg("a-z").arg("A-Z"),
            StageCommand::new("cat").stdout_to(Arg::Destination(dest)),
        ];
        let script = format!("printf 'abc' | {}", render_chain(&chain).unwrap());
        sh(&script, "chunk");
        let written = std::fs::read_to_string(tmp.path().join("chunk.txt")).unwrap();
        assert_eq!(written, "ABC");
    }

    #[test]
    fn test_to_command_renders_filter_as_one_arg() {
        let cmd = StageCommand::new("sh").arg("-c").arg(Arg::Filter(vec![
            StageCommand::new("echo").arg("x y"),
            StageCommand::new("tr").arg("x").arg("z"),
        ]));
        let out = to_command(&cmd).unwrap().output().unwrap();
        assert_eq!(String::from_utf8(out.stdout).unwrap(), "z y\n");
    }

    #[test]
    fn test_to_command_rejects_shell_only_words() {
        let dest = DestinationTemplate::new("/tmp", ".csv");
        let cmd = StageCommand::new("cat").arg(Arg::Destination(dest.clone()));
        assert!(matches!(to_command(&cmd), Err(ExportError::CommandError(_))));
        let cmd = StageCommand::new("cat").stdout_to(Arg::Destination(dest));
        assert!(matches!(to_command(&cmd), Err(ExportError::CommandError(_))));
    }

    #[test]
    fn test_display_masks_password() {
        let cmd = StageCommand::new("bcp").args(["-U", "sa", "-P", "secret"]);
        assert_eq!(display_command(&cmd), "bcp -U sa -P ****");
    }

    #[test]
    fn test_require_executables() {
        assert!(require_executables(["sh"]).is_ok());
        assert!(matches!(
            require_executables(["sh", "definitely-not-a-real-binary-xyz"]),
            Err(ExportError::ExecutableNotFoundError(p)) if p == "definitely-not-a-real-binary-xyz"
        ));
    }
}
