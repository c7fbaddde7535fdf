use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Asks the user where the client secrets file lives
pub trait SecretsPrompt: Send + Sync {
    fn client_secrets_path(&self) -> Result<PathBuf>;
}

/// Prompts on the attached terminal; fails when stdin is not a terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl SecretsPrompt for ConsolePrompt {
    fn client_secrets_path(&self) -> Result<PathBuf> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Err(Error::Input(
                "a client secrets file was not provided, the default client secrets file could \
                 not be found and no console is attached to ask for one"
                    .to_string(),
            ));
        }

        let mut out = io::stdout().lock();
        writeln!(
            out,
            "A client secrets file was not provided and the default client secrets file could \
             not be found in the resources folder."
        )?;
        writeln!(out, "Please provide the path to a client secrets JSON file.")?;
        writeln!(out, "Enter path to client secrets file:")?;
        out.flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        parse_answer(&line)
    }
}

fn parse_answer(line: &str) -> Result<PathBuf> {
    let path = line.trim();
    if path.is_empty() {
        return Err(Error::Input("no client secrets path was entered".to_string()));
    }
    Ok(PathBuf::from(path))
}
