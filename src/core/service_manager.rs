use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, warn};

const RESTART_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
#[error("{0}")]
pub struct Error(String);

impl Error {
    pub fn new(s: &str) -> Error {
        Error(s.to_string())
    }

    pub fn from<E: std::error::Error>(e: E) -> Self {
        Self(e.to_string())
    }
}

#[async_trait]
pub trait Service: Sized {
    type Context: Clone + Send;
    async fn new(context: Self::Context) -> Result<Self, Error>;
    async fn run(self) -> Result<(), Error>;
}

#[async_trait]
pub trait ServiceWithErrorSender: Sized {
    type Context: Clone + Send;
    async fn new(context: Self::Context, error_sender: mpsc::Sender<String>)
        -> Result<Self, Error>;
    async fn run(self) -> Result<(), Error>;
}

#[async_trait]
pub trait ServiceWithErrorReceiver: Sized {
    type Context: Clone + Send;
    async fn new(
        context: Self::Context,
        receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    ) -> Result<Self, Error>;
    async fn run(self) -> Result<(), Error>;
}

pub struct ServiceManager<C> {
    context: C,
    services: JoinSet<()>,
}

impl<C> ServiceManager<C>
where
    C: 'static + Clone + Send + Sync,
{
    pub fn new(context: C) -> Self {
        Self {
            context,
            services: JoinSet::new(),
        }
    }

    pub fn spawn<T>(&mut self, name: &'static str)
    where
        T: Service<Context = C> + Send + 'static,
    {
        let context = self.context.clone();
        self.services.spawn(async move {
            loop {
                let result = match T::new(context.clone()).await {
                    Ok(service) => service.run().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => break,
                    Err(e) => {
                        error!(service = name, error = %e, "Service failed, restarting");
                        tokio::time::sleep(RESTART_DELAY).await;
                    }
                }
            }
        });
    }

    pub fn spawn_with_error_sender<T>(&mut self, name: &'static str, sender: mpsc::Sender<String>)
    where
        T: ServiceWithErrorSender<Context = C> + Send + 'static,
    {
        let context = self.context.clone();
        self.services.spawn(async move {
            loop {
                let result = match T::new(context.clone(), sender.clone()).await {
                    Ok(service) => service.run().await,
                    Err(e) => Err(e),
                };
                match result {
                    Ok(()) => break,
                    Err(e) => {
                        error!(service = name, error = %e, "Service failed, restarting");
                        tokio::time::sleep(RESTART_DELAY).await;
                    }
                }
            }
        });
    }

    pub fn spawn_with_error_receiver<T>(
        &mut self,
        name: &'static str,
        receiver: Arc<Mutex<mpsc::Receiver<String>>>,
    ) where
        T: ServiceWithErrorReceiver<Context = C> + Send + 'static,
    {
        let context = self.context.clone();
        self.services.spawn(async move {
            loop {
                let result = match T::new(context.clone(), receiver.clone()).await {
                    Ok(service) => service.run().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    warn!(service = name, error = %e, "Service stopped");
                    break;
                }
            }
        });
    }

    /// Resolves as soon as any managed service exits for good.
    pub async fn wait(&mut self) -> Result<(), Error> {
        if self.services.join_next().await.is_some() {
            return Err(Error::new("Internal Service Error"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Counter(Arc<AtomicUsize>);

    struct OneShot;

    #[async_trait]
    impl Service for OneShot {
        type Context = Counter;

        async fn new(context: Counter) -> Result<Self, Error> {
            context.0.fetch_add(1, Ordering::SeqCst);
            Ok(Self)
        }

        async fn run(self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_wait_returns_when_service_exits() {
        let counter = Counter(Arc::new(AtomicUsize::new(0)));
        let mut manager = ServiceManager::new(counter.clone());
        manager.spawn::<OneShot>("one-shot");

        assert!(manager.wait().await.is_err());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
