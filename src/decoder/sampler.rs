/// Picks source frames so that output frame `k` shows time `k / target_fps`.
///
/// When the target rate exceeds the native rate a source frame is emitted
/// more than once; when the native rate is unknown every frame is kept.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    native_fps: Option<f64>,
    target_fps: f64,
    next_output: u64,
}

// Guards against t * fps landing just below an integer.
const EPSILON: f64 = 1e-6;

impl FrameSampler {
    pub fn new(native_fps: Option<f64>, target_fps: f64) -> Self {
        Self { native_fps, target_fps, next_output: 0 }
    }

    fn source_index_for(&self, output: u64) -> u64 {
        match self.native_fps {
            Some(native) => {
                let t = output as f64 / self.target_fps;
                (t * native + EPSILON).floor() as u64
            }
            None => output,
        }
    }

    /// How many output frames the source frame `source_index` stands for.
    ///
    /// Must be called for every source index in increasing order.
    pub fn take(&mut self, source_index: u64) -> usize {
        if self.source_index_for(self.next_output) != source_index {
            return 0;
        }
        let end = match self.native_fps {
            Some(native) => {
                // first output past this source frame, then nudged onto the exact boundary
                let estimate = ((source_index + 1) as f64 - EPSILON) * self.target_fps / native;
                let mut end = (estimate.ceil() as u64).max(self.next_output + 1);
                while end > self.next_output + 1 && self.source_index_for(end - 1) > source_index {
                    end -= 1;
                }
                while self.source_index_for(end) <= source_index {
                    end += 1;
                }
                end
            }
            None => self.next_output + 1,
        };
        let count = end - self.next_output;
        self.next_output = end;
        count as usize
    }
}
