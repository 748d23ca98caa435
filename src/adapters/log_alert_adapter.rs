//! Alert adapter that writes the formatted alert to the log.

use crate::domain::error::SweepscanError;
use crate::domain::signal::CandidateSignal;
use crate::ports::alert_port::AlertPort;
use log::info;

#[derive(Debug, Default)]
pub struct LogAlert;

impl AlertPort for LogAlert {
    fn deliver(&self, signal: &CandidateSignal, message: &str) -> Result<(), SweepscanError> {
        for line in message.lines() {
            info!("[alert {}] {}", signal.instrument, line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal::{Direction, fixtures, format_alert};

    #[test]
    fn delivery_never_fails() {
        let signal = fixtures::signal("EURUSD", Direction::Long, 0.6);
        assert!(LogAlert.deliver(&signal, &format_alert(&signal)).is_ok());
    }
}
