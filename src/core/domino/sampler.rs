/// Admission control: lets through at most `fps` frames per second of camera time,
/// whatever rate the camera delivers at.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval_ms: u64,
    last_admitted_ms: Option<u64>,
    admitted: u64,
    skipped: u64,
}

impl FrameSampler {
    pub fn new(fps: u32) -> Self {
        Self::with_interval(1000 / fps.max(1) as u64)
    }

    pub fn with_interval(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_admitted_ms: None,
            admitted: 0,
            skipped: 0,
        }
    }

    pub fn admit(&mut self, timestamp_ms: u64) -> bool {
        let due = match self.last_admitted_ms {
            None => true,
            // timestamps went backwards: the camera restarted its clock
            Some(last) if timestamp_ms < last => true,
            Some(last) => timestamp_ms - last >= self.interval_ms,
        };

        if due {
            self.last_admitted_ms = Some(timestamp_ms);
            self.admitted += 1;
        } else {
            self.skipped += 1;
        }
        due
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn reset(&mut self) {
        self.last_admitted_ms = None;
        self.admitted = 0;
        self.skipped = 0;
    }
}
