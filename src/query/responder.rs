use std::fmt::{self, Debug, Formatter};

use flume::Sender;

/// Where the result of a lookup is delivered.
pub enum Responder<T> {
    /// Called once with the result, on the thread driving the query manager.
    ///
    /// Callbacks must not call back into the query manager that invokes them.
    Callback(Box<dyn FnOnce(T)>),
    Channel(Sender<T>),
}

impl<T> Responder<T> {
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(T) + 'static,
    {
        Responder::Callback(Box::new(f))
    }

    /// A responder that drops the result.
    pub fn noop() -> Self {
        Responder::Callback(Box::new(|_| {}))
    }

    pub fn respond(self, value: T) {
        match self {
            Responder::Callback(f) => f(value),
            Responder::Channel(sender) => {
                // The receiver may be gone, nobody is waiting then.
                let _ = sender.send(value);
            }
        }
    }
}

impl<T> From<Sender<T>> for Responder<T> {
    fn from(sender: Sender<T>) -> Self {
        Responder::Channel(sender)
    }
}

impl<T> Debug for Responder<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Responder::Callback(_) => write!(f, "Responder::Callback"),
            Responder::Channel(_) => write!(f, "Responder::Channel"),
        }
    }
}
