use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::ShellError;

/// Line-oriented terminal: labels out, trimmed answers in.
pub struct Prompt<R, W> {
    lines: Lines<BufReader<R>>,
    out: W,
}

impl<R, W> Prompt<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
            out,
        }
    }

    pub async fn say(&mut self, text: impl AsRef<str>) -> Result<(), ShellError> {
        self.out.write_all(text.as_ref().as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    /// Print `label` and read one line. End of input is [`ShellError::Closed`].
    pub async fn ask(&mut self, label: &str) -> Result<String, ShellError> {
        self.out.write_all(label.as_bytes()).await?;
        self.out.flush().await?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(ShellError::Closed),
        }
    }

    /// Like [`Prompt::ask`] for a count; blank input takes `default`.
    /// `None` when the answer is not a number.
    pub async fn ask_count(&mut self, label: &str, default: usize) -> Result<Option<usize>, ShellError> {
        let answer = self.ask(&format!("{} [{}]: ", label, default)).await?;
        if answer.is_empty() {
            return Ok(Some(default));
        }
        Ok(answer.parse().ok())
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
