use chrono::Utc;
use rand::Rng;

/// Hooks through which a run reaches its embedding application.
/// Every method has a default, so hosts override only what they
/// can provide.
pub trait Host {
    /// Shows a message to the user (`nbh`)
    fn alert(&mut self, _message: &str) {}

    /// Asks the user for a line of text (`sowel`). `None` means the
    /// question was dismissed.
    fn prompt(&mut self, _message: &str) -> Option<String> {
        None
    }

    /// Asks the user a yes/no question (`t2kd`)
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }

    /// Milliseconds since the Unix epoch
    fn now_ms(&mut self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }

    /// A uniformly distributed number in `[0, 1)`
    fn random(&mut self) -> f64 {
        rand::thread_rng().gen()
    }
}

/// Host used by the command line and by `run`: no interactive
/// answers, system clock and thread-local randomness.
#[derive(Debug, Default)]
pub struct StdHost;

impl Host for StdHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_host_defaults() {
        let mut host = StdHost;
        assert_eq!(host.prompt("smitek?"), None);
        assert!(!host.confirm("wach?"));
        // 2020-01-01T00:00:00Z
        assert!(host.now_ms() > 1_577_836_800_000.0);
        for _ in 0..100 {
            let n = host.random();
            assert!((0.0..1.0).contains(&n));
        }
    }
}
