//! Interactive prompts on stdin

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};

/// Ask for a value until a non-empty answer is given
///
/// Fails when stdin is closed.
pub fn required(label: &str) -> Result<String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("{}: ", label);
        io::stdout().flush()?;

        match read_answer(&mut input)? {
            Some(answer) if !answer.is_empty() => return Ok(answer),
            Some(_) => continue,
            None => bail!("No value given for '{}' (stdin closed)", label),
        }
    }
}

/// Read one trimmed line; `None` at end of input
fn read_answer(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_answer() {
        let mut input = Cursor::new("  api://app/.default \n\nnext\n");
        assert_eq!(
            read_answer(&mut input).unwrap().as_deref(),
            Some("api://app/.default")
        );
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some(""));
        assert_eq!(read_answer(&mut input).unwrap().as_deref(), Some("next"));
        assert_eq!(read_answer(&mut input).unwrap(), None);
    }
}
