use crate::core::Ui;
use std::io::{self, BufRead, Write};

/// Alerts go to the output stream; confirmations read `y/N` from the input.
pub struct TerminalUi<R: BufRead, W: Write> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl TerminalUi<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio(assume_yes: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), assume_yes)
    }
}

impl<R: BufRead, W: Write> TerminalUi<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    pub fn set_assume_yes(&mut self, assume_yes: bool) {
        self.assume_yes = assume_yes;
    }

    /// Read one line, `None` on end of input.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    pub fn print(&mut self, text: &str) {
        if let Err(e) = writeln!(self.output, "{}", text) {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<R: BufRead, W: Write> Ui for TerminalUi<R, W> {
    fn alert(&mut self, message: &str) {
        self.print(&format!("⚠️  {}", message));
    }

    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            self.print(&format!("{} [y/N] y", message));
            return true;
        }

        match self.read_line(&format!("{} [y/N] ", message)) {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "c" | "có")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ui(input: &str, assume_yes: bool) -> TerminalUi<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalUi::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), assume_yes)
    }

    fn written(ui: &TerminalUi<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(ui.output().clone()).unwrap()
    }

    #[test]
    fn test_confirm_reads_answer() {
        let mut terminal = ui("y\n", false);
        assert!(terminal.confirm("Xóa?"));
        assert_eq!(written(&terminal), "Xóa? [y/N] ");

        let mut terminal = ui("\n", false);
        assert!(!terminal.confirm("Xóa?"));

        let mut terminal = ui("Có\n", false);
        assert!(terminal.confirm("Xóa?"));
    }

    #[test]
    fn test_confirm_at_end_of_input_declines() {
        let mut terminal = ui("", false);
        assert!(!terminal.confirm("Xóa?"));
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        let mut terminal = ui("", true);
        assert!(terminal.confirm("Xóa?"));
        assert_eq!(written(&terminal), "Xóa? [y/N] y\n");
    }

    #[test]
    fn test_alert_prints_line() {
        let mut terminal = ui("", false);
        terminal.alert("Cập nhật thông tin thành công");
        assert_eq!(written(&terminal), "⚠️  Cập nhật thông tin thành công\n");
    }

    #[test]
    fn test_read_line_strips_newline() {
        let mut terminal = ui("users\r\nnext\n", false);
        assert_eq!(terminal.read_line("> ").unwrap().as_deref(), Some("users"));
        assert_eq!(terminal.read_line("> ").unwrap().as_deref(), Some("next"));
        assert_eq!(terminal.read_line("> ").unwrap(), None);
    }
}
