use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::AssetGrid;
use crate::error::ApplyError;
use crate::models::ChangeDescription;
use crate::notify::{ChangeNotificationSource, ChangeObserver, MainContext, MainHandle, SubscriptionId};
use crate::preheat::ImageCachingService;

/// Forwards published changes onto the apply context and waits for them to
/// be reconciled before the publisher continues.
struct GridChangeObserver<S: ?Sized> {
    handle: MainHandle<AssetGrid<S>>,
}

impl<S> ChangeObserver for GridChangeObserver<S>
where
    S: ImageCachingService + ?Sized + 'static,
{
    fn library_did_change(&self, change: &ChangeDescription) {
        let change = change.clone();
        match self.handle.sync(move |grid| grid.library_did_change(change)) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Rejected library change"),
            Err(e) => warn!(error = %e, "Could not deliver library change"),
        }
    }
}

/// A grid running on its own apply context and subscribed to a change
/// source for as long as the session lives.
pub struct GridSession<S: ImageCachingService + ?Sized + 'static> {
    context: Option<MainContext<AssetGrid<S>>>,
    handle: MainHandle<AssetGrid<S>>,
    source: Arc<dyn ChangeNotificationSource>,
    subscription: Option<SubscriptionId>,
}

impl<S: ImageCachingService + ?Sized + 'static> GridSession<S> {
    /// Moves `grid` onto a new apply context, shows it and subscribes to
    /// `source`.
    pub fn start(grid: AssetGrid<S>, source: Arc<dyn ChangeNotificationSource>) -> Result<Self> {
        let context = MainContext::spawn("grid-apply", grid)?;
        let handle = context.handle();
        handle
            .sync(|grid| grid.appear())
            .context("Failed to show grid")?;

        let observer = Arc::new(GridChangeObserver {
            handle: handle.clone(),
        });
        let subscription = source.subscribe(observer);
        info!(?subscription, "Grid session started");

        Ok(Self {
            context: Some(context),
            handle,
            source,
            subscription: Some(subscription),
        })
    }

    pub fn handle(&self) -> MainHandle<AssetGrid<S>> {
        self.handle.clone()
    }

    /// Runs `f` against the grid on its apply context.
    pub fn with_grid<R, F>(&self, f: F) -> Result<R, ApplyError>
    where
        R: Send + 'static,
        F: FnOnce(&mut AssetGrid<S>) -> R + Send + 'static,
    {
        self.handle.sync(f)
    }

    /// Unsubscribes, hides the grid and hands it back.
    pub fn stop(mut self) -> Result<AssetGrid<S>, ApplyError> {
        self.unsubscribe();
        self.handle.sync(|grid| grid.disappear())?;
        let context = self.context.take().ok_or(ApplyError::Closed)?;
        let grid = context.shutdown()?;
        info!("Grid session stopped");
        Ok(grid)
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.unsubscribe(id);
        }
    }
}

impl<S: ImageCachingService + ?Sized + 'static> Drop for GridSession<S> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
