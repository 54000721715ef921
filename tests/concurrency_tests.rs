//! # Concurrency Tests using Loom
//!
//! The runner's stdout is read on a tokio task and handed to the polling
//! thread, which drains whatever is available and treats "reader closed" as
//! "every line delivered". This models that hand-off with loom primitives and
//! checks that no interleaving lets the poller see the close before a line.

#[cfg(test)]
mod tests {
    use loom::sync::atomic::{AtomicBool, Ordering};
    use loom::sync::{Arc, Mutex};
    use loom::thread;
    use std::collections::VecDeque;

    const LINES: usize = 2;

    struct Pipe {
        queue: Mutex<VecDeque<usize>>,
        closed: AtomicBool,
    }

    /// One non-blocking drain: checks the close flag first, then takes every
    /// queued line. Returns whether the reader was already closed.
    fn drain(pipe: &Pipe, received: &mut Vec<usize>) -> bool {
        let closed = pipe.closed.load(Ordering::Acquire);
        let mut queue = pipe.queue.lock().unwrap();
        received.extend(queue.drain(..));
        closed
    }

    #[test]
    fn test_closed_reader_has_delivered_every_line() {
        loom::model(|| {
            let pipe = Arc::new(Pipe {
                queue: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(false),
            });

            let producer = {
                let pipe = pipe.clone();
                thread::spawn(move || {
                    for line in 0..LINES {
                        pipe.queue.lock().unwrap().push_back(line);
                    }
                    pipe.closed.store(true, Ordering::Release);
                })
            };

            let mut received = Vec::new();
            // Two polls race with the producer.
            for _ in 0..2 {
                if drain(&pipe, &mut received) {
                    assert_eq!(received, (0..LINES).collect::<Vec<_>>());
                }
            }

            producer.join().unwrap();
            drain(&pipe, &mut received);
            assert_eq!(received, (0..LINES).collect::<Vec<_>>());
        });
    }
}
