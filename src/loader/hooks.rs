//! Lifecycle hooks
//!
//! A hook receives the item by value and hands it back when its future
//! resolves. Resolving is the continuation: the item's pipeline, and the
//! concurrency slot it holds, stay parked until then. Other items keep
//! loading in the meantime.

use crate::loader::{BulkHtmlLoader, LoaderItem};
use crate::LoaderError;
use futures_util::future::{FutureExt, LocalBoxFuture};
use std::future::Future;

type ItemHandler = Box<dyn Fn(LoaderItem) -> LocalBoxFuture<'static, LoaderItem>>;
type ChangeHandler = Box<dyn Fn(&LoaderItem, &BulkHtmlLoader)>;

/// Pipeline decision points that hand the item to a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookKind {
    Warning,
    Error,
    ItemLoadComplete,
}

impl HookKind {
    fn name(self) -> &'static str {
        match self {
            Self::Warning => "on_warning",
            Self::Error => "on_error",
            Self::ItemLoadComplete => "on_item_load_complete",
        }
    }
}

/// Registered handlers of one loader
#[derive(Default)]
pub(crate) struct Hooks {
    warning: Option<ItemHandler>,
    error: Option<ItemHandler>,
    item_load_complete: Option<ItemHandler>,
    change: Option<ChangeHandler>,
}

impl Hooks {
    /// Registers `handler` for `kind`, replacing any previous one
    pub(crate) fn set<F, Fut>(&mut self, kind: HookKind, handler: F)
    where
        F: Fn(LoaderItem) -> Fut + 'static,
        Fut: Future<Output = LoaderItem> + 'static,
    {
        let boxed: ItemHandler = Box::new(move |item| handler(item).boxed_local());

        match kind {
            HookKind::Warning => self.warning = Some(boxed),
            HookKind::Error => self.error = Some(boxed),
            HookKind::ItemLoadComplete => self.item_load_complete = Some(boxed),
        }
    }

    pub(crate) fn set_change<F>(&mut self, handler: F)
    where
        F: Fn(&LoaderItem, &BulkHtmlLoader) + 'static,
    {
        self.change = Some(Box::new(handler));
    }

    pub(crate) fn notify_change(&self, item: &LoaderItem, loader: &BulkHtmlLoader) {
        if let Some(handler) = &self.change {
            handler(item, loader);
        }
    }

    /// Hands `item` to the handler registered for `kind` and waits for it back
    ///
    /// Without a handler the item passes straight through.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::HandlerItemMismatch`] when the handler resolves
    /// with an item other than the one it was given.
    pub(crate) async fn dispatch(
        &self,
        kind: HookKind,
        item: LoaderItem,
    ) -> Result<LoaderItem, LoaderError> {
        let handler = match kind {
            HookKind::Warning => &self.warning,
            HookKind::Error => &self.error,
            HookKind::ItemLoadComplete => &self.item_load_complete,
        };

        let Some(handler) = handler else {
            return Ok(item);
        };

        let expected = item.id();
        let url = item.url().to_string();
        let returned = handler(item).await;

        if returned.id() != expected {
            return Err(LoaderError::HandlerItemMismatch {
                hook: kind.name(),
                expected: url,
                actual: returned.url().to_string(),
            });
        }

        Ok(returned)
    }
}
