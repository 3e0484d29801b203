use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};

use crate::error::SessionError;

/// Line-oriented operator terminal.
pub trait Console {
	/// Reads one line without its terminator. `None` at end of input.
	fn read_line(&mut self) -> io::Result<Option<String>>;

	/// Writes text as-is and flushes it.
	fn write(&mut self, text: &str) -> io::Result<()>;
}

/// [`Console`] over any buffered reader and writer.
///
/// `Terminal::stdio()` for interactive use; tests feed a scripted
/// `Cursor` and inspect the captured output.
pub struct Terminal<R, W> {
	input: R,
	output: W,
}

impl<R, W> Terminal<R, W> {
	pub fn new(input: R, output: W) -> Self {
		Self { input, output }
	}

	pub fn into_output(self) -> W {
		self.output
	}
}

impl Terminal<StdinLock<'static>, Stdout> {
	pub fn stdio() -> Self {
		let stdin: Stdin = io::stdin();
		Self::new(stdin.lock(), io::stdout())
	}
}

impl<R: BufRead, W: Write> Console for Terminal<R, W> {
	fn read_line(&mut self) -> io::Result<Option<String>> {
		let mut line = String::new();
		if self.input.read_line(&mut line)? == 0 {
			return Ok(None);
		}
		Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
	}

	fn write(&mut self, text: &str) -> io::Result<()> {
		self.output.write_all(text.as_bytes())?;
		self.output.flush()
	}
}

/// Prompting helpers available on every console.
pub trait Prompt: Console {
	/// Writes one line.
	fn say(&mut self, text: &str) -> Result<(), SessionError> {
		self.write(text)?;
		self.write("\n")?;
		Ok(())
	}

	/// Shows `prompt` and returns the operator's answer.
	///
	/// # Errors
	/// `SessionError::InputClosed` once the input is exhausted.
	fn ask(&mut self, prompt: &str) -> Result<String, SessionError> {
		self.write(prompt)?;
		self.read_line()?.ok_or(SessionError::InputClosed)
	}

	/// Asks a y/n question until the answer is one of them.
	fn confirm(&mut self, prompt: &str) -> Result<bool, SessionError> {
		loop {
			match self.ask(prompt)?.trim().to_lowercase().as_str() {
				"y" | "yes" => return Ok(true),
				"n" | "no" => return Ok(false),
				other => self.say(&format!("Please answer y or n, not '{other}'."))?,
			}
		}
	}
}

impl<C: Console + ?Sized> Prompt for C {}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	fn terminal(script: &str) -> Terminal<Cursor<Vec<u8>>, Vec<u8>> {
		Terminal::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
	}

	#[test]
	fn lines_lose_their_terminators() {
		let mut console = terminal("first\r\nsecond\n");
		assert_eq!(console.read_line().expect("read"), Some("first".to_owned()));
		assert_eq!(console.read_line().expect("read"), Some("second".to_owned()));
		assert_eq!(console.read_line().expect("read"), None);
	}

	#[test]
	fn ask_fails_once_input_is_closed() {
		let mut console = terminal("");
		assert!(matches!(console.ask("? "), Err(SessionError::InputClosed)));
	}

	#[test]
	fn confirm_reprompts_until_valid() {
		let mut console = terminal("maybe\nY\n");
		assert!(console.confirm("Save? (y/n): ").expect("answer"));
		let output = String::from_utf8(console.into_output()).expect("utf8");
		assert_eq!(output.matches("Save? (y/n): ").count(), 2);
		assert!(output.contains("not 'maybe'"));
	}
}
