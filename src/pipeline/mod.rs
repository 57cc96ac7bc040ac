//! Ordered interceptor chain wrapped around a terminal async function.
//!
//! Every inbound event passes through [`MiddlewarePipeline::execute`]. Each
//! interceptor receives the shared arguments plus a [`Next`] continuation and
//! decides whether the rest of the chain runs.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::sync::lock_or_recover;

const SOURCE: &str = "pipeline";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("continuation at position {position} was already run")]
    ContinuationReused { position: usize },
    #[error("terminal handler was already consumed")]
    TerminalConsumed,
}

/// One link in the chain.
///
/// Returning without calling [`Next::run`] short-circuits everything after
/// this interceptor, including the terminal.
#[async_trait]
pub trait Interceptor<A, E>: Send + Sync {
    async fn intercept(&self, args: &A, next: Next<'_, '_, A, E>) -> Result<(), E>;
}

type Terminal<'c, E> = Box<dyn FnOnce() -> BoxFuture<'c, Result<(), E>> + Send + 'c>;

struct Chain<'c, A, E> {
    stack: &'c [Arc<dyn Interceptor<A, E>>],
    args: &'c A,
    terminal: Mutex<Option<Terminal<'c, E>>>,
}

impl<'c, A, E> Chain<'c, A, E>
where
    A: Sync,
    E: From<PipelineError> + Send,
{
    fn invoke(&self, position: usize) -> BoxFuture<'_, Result<(), E>> {
        Box::pin(async move {
            match self.stack.get(position) {
                Some(interceptor) => {
                    let next = Next {
                        chain: self,
                        position: position + 1,
                        called: AtomicBool::new(false),
                    };
                    interceptor.intercept(self.args, next).await
                }
                None => {
                    let terminal = lock_or_recover(&self.terminal, SOURCE, "take_terminal").take();
                    match terminal {
                        Some(terminal) => terminal().await,
                        None => Err(PipelineError::TerminalConsumed.into()),
                    }
                }
            }
        })
    }
}

/// Continuation handed to an interceptor. It can be run at most once.
pub struct Next<'n, 'c, A, E> {
    chain: &'n Chain<'c, A, E>,
    position: usize,
    called: AtomicBool,
}

impl<'n, 'c, A, E> Next<'n, 'c, A, E>
where
    A: Sync,
    E: From<PipelineError> + Send,
{
    /// Run the rest of the chain: the next interceptor, or the terminal once
    /// the stack is exhausted.
    pub async fn run(&self) -> Result<(), E> {
        if self.called.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::ContinuationReused {
                position: self.position,
            }
            .into());
        }
        self.chain.invoke(self.position).await
    }

    /// Index of the link this continuation would run.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Reusable interceptor stack.
pub struct MiddlewarePipeline<A, E> {
    stack: Vec<Arc<dyn Interceptor<A, E>>>,
}

impl<A, E> Default for MiddlewarePipeline<A, E> {
    fn default() -> Self {
        Self { stack: Vec::new() }
    }
}

impl<A, E> MiddlewarePipeline<A, E>
where
    A: Sync,
    E: From<PipelineError> + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interceptor: Arc<dyn Interceptor<A, E>>) -> &mut Self {
        self.stack.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run `args` through every interceptor and finally `terminal`.
    ///
    /// Returns `Ok(None)` when an interceptor short-circuited, otherwise the
    /// terminal's output. Errors from any link abort the chain.
    pub async fn execute<'a, T, Fut, R>(&'a self, args: &'a A, terminal: T) -> Result<Option<R>, E>
    where
        T: FnOnce(&'a A) -> Fut + Send + 'a,
        Fut: Future<Output = Result<R, E>> + Send + 'a,
        R: Send + 'a,
    {
        let output: Mutex<Option<R>> = Mutex::new(None);
        {
            let slot = &output;
            let terminal: Terminal<'_, E> = Box::new(move || {
                async move {
                    let value = terminal(args).await?;
                    *lock_or_recover(slot, SOURCE, "store_output") = Some(value);
                    Ok(())
                }
                .boxed()
            });
            let chain = Chain {
                stack: &self.stack,
                args,
                terminal: Mutex::new(Some(terminal)),
            };
            chain.invoke(0).await?;
        }
        Ok(output.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
