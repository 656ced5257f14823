//! Console driver for development/testing

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use crate::application::errors::BotError;
use crate::application::messaging::Dispatcher;
use crate::domain::entities::{Request, RequestExtra};
use crate::domain::traits::{Driver, DriverCapabilities};

/// Reads messages from a line source and writes replies to `W`
pub struct ConsoleDriver<W: Write> {
    bot_name: String,
    prompt: Option<String>,
    out: RefCell<W>,
}

impl ConsoleDriver<io::Stdout> {
    pub fn stdout(bot_name: impl Into<String>) -> Self {
        Self::new(bot_name, io::stdout())
    }
}

impl<W: Write> ConsoleDriver<W> {
    pub fn new(bot_name: impl Into<String>, out: W) -> Self {
        Self {
            bot_name: bot_name.into(),
            prompt: None,
            out: RefCell::new(out),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    /// Dispatch every non-blank line until EOF. Returns how many were dispatched.
    pub fn run<R: BufRead>(&self, dispatcher: &Dispatcher, input: R) -> Result<usize, BotError> {
        tracing::info!("Starting console driver (dev mode)");

        let mut lines = input.lines();
        let mut line_no: u64 = 0;
        let mut dispatched = 0;

        loop {
            self.show_prompt()?;
            let Some(line) = lines.next() else { break };
            let line = line?;
            line_no += 1;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            let extra = RequestExtra::new().with_kwarg("line", line_no);
            let request = dispatcher.dispatch(text, Some(self as &dyn Driver), extra);
            if !request.is_accepted() {
                tracing::debug!("Line {} ignored by all plugins", line_no);
            }
            dispatched += 1;
        }

        tracing::info!("Console input closed after {} messages", dispatched);
        Ok(dispatched)
    }

    fn show_prompt(&self) -> Result<(), BotError> {
        if let Some(prompt) = &self.prompt {
            let mut out = self.out.borrow_mut();
            write!(out, "{}", prompt)?;
            out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> Driver for ConsoleDriver<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn capabilities(&self) -> DriverCapabilities {
        DriverCapabilities::ALL
    }

    fn working(&self, active: bool, _request: &Request<'_>) -> Result<(), BotError> {
        if active {
            let mut out = self.out.borrow_mut();
            writeln!(out, "({} is typing...)", self.bot_name)?;
            out.flush()?;
        }
        Ok(())
    }

    fn say(&self, text: &str, _request: &Request<'_>) -> Result<(), BotError> {
        let mut out = self.out.borrow_mut();
        writeln!(out, "[{}] {}", self.bot_name, text)?;
        out.flush()?;
        Ok(())
    }
}
