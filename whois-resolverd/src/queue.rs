use shared::types::Job;

/// Unbounded FIFO of pending jobs. Submissions append from any task while the
/// drain loop pops from the head.
#[derive(Clone)]
pub struct JobQueue {
    tx: flume::Sender<Job>,
    rx: flume::Receiver<Job>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    /// Append a job to the tail. Returns the queue depth after the append.
    pub fn enqueue(&self, job: Job) -> usize {
        // Every handle holds a receiver, so the channel never disconnects
        let _ = self.tx.send(job);
        self.tx.len()
    }

    /// Pop the head of the queue, if any
    pub fn try_dequeue(&self) -> Option<Job> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
