use crate::util;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatistics {
    pub bytes_written: u64,
    pub segments_written: u64,
    pub cycles: u64,
    pub failures: u64,
}

impl SessionStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_segment(&mut self, bytes: usize) {
        self.bytes_written += bytes as u64;
        self.segments_written += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "{} segments ({}) in {} cycles, {} failed",
            self.segments_written,
            util::format_bytes(self.bytes_written),
            self.cycles,
            self.failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary() {
        let mut stats = SessionStatistics::new();
        stats.record_segment(1024);
        stats.record_segment(2048);
        stats.cycles = 4;
        stats.failures = 1;

        assert_eq!(stats.bytes_written, 3072);
        assert_eq!(stats.summary(), "2 segments (3.00 KiB) in 4 cycles, 1 failed");
    }
}
