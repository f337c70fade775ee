//! Actions: named units of scaffolding logic with optional async hooks.
//!
//! Every hook is an explicit `Option`. An absent gate means "proceed", an
//! absent body means "nothing to do". Hooks receive one owned parameter
//! struct per phase and may suspend freely; the orchestrator awaits them one
//! at a time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::Context;
use crate::core::data::CollectedData;
use crate::output::OutputCollection;

/// Future returned by every hook.
pub type HookFuture<T> = BoxFuture<'static, Result<T>>;

/// A hook taking phase parameters `P` and resolving to `T`.
pub type Hook<P, T> = Arc<dyn Fn(P) -> HookFuture<T> + Send + Sync>;

/// Parameters for `can_load`.
#[derive(Debug, Clone)]
pub struct LoadParams {
    pub files: OutputCollection,
    pub context: Context,
    /// The sibling list currently being loaded.
    pub actions: Arc<[Arc<Action>]>,
}

/// Parameters for `can_collect_data` and `collect_data`.
#[derive(Debug, Clone)]
pub struct CollectParams {
    pub files: OutputCollection,
    pub context: Context,
    /// Data returned by the actions loaded before this one.
    pub up_to_now: Arc<CollectedData>,
}

/// Parameters for `can_execute_action`.
#[derive(Debug, Clone)]
pub struct ExecuteGateParams {
    pub files: OutputCollection,
    pub context: Context,
    pub full_data: Arc<CollectedData>,
}

/// Parameters for `action`.
#[derive(Debug, Clone)]
pub struct ActionParams {
    pub files: OutputCollection,
    pub context: Context,
    /// Every loaded action, in load order.
    pub actions: Arc<[Arc<Action>]>,
    /// This action's own collected data, if any.
    pub data: Option<Value>,
    pub full_data: Arc<CollectedData>,
}

/// Parameters for `post_write`.
#[derive(Debug, Clone)]
pub struct PostWriteParams {
    pub files: OutputCollection,
    pub context: Context,
    pub data: Option<Value>,
    pub full_data: Arc<CollectedData>,
}

impl ActionParams {
    /// Decode this action's own data.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode_own_data(self.data.as_ref(), self.context.name())
    }
}

impl PostWriteParams {
    /// Decode this action's own data.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode_own_data(self.data.as_ref(), self.context.name())
    }
}

fn decode_own_data<T: DeserializeOwned>(data: Option<&Value>, name: &str) -> Result<Option<T>> {
    data.map(|value| {
        serde_json::from_value(value.clone())
            .with_context(|| format!("decode collected data for `{name}`"))
    })
    .transpose()
}

/// A node of the action tree.
///
/// Built with [`Action::new`] and the chained hook setters; immutable once
/// handed to the orchestrator.
pub struct Action {
    name: String,
    description: String,
    sub_actions: Vec<Arc<Action>>,
    pub(crate) can_load: Option<Hook<LoadParams, bool>>,
    pub(crate) can_collect_data: Option<Hook<CollectParams, bool>>,
    pub(crate) collect_data: Option<Hook<CollectParams, Value>>,
    pub(crate) can_execute_action: Option<Hook<ExecuteGateParams, bool>>,
    pub(crate) action: Option<Hook<ActionParams, ()>>,
    pub(crate) post_write: Option<Hook<PostWriteParams, ()>>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_actions: Vec::new(),
            can_load: None,
            can_collect_data: None,
            collect_data: None,
            can_execute_action: None,
            action: None,
            post_write: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sub_actions(&self) -> &[Arc<Action>] {
        &self.sub_actions
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_sub_action(mut self, action: Action) -> Self {
        self.sub_actions.push(Arc::new(action));
        self
    }

    pub fn with_sub_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.sub_actions.extend(actions.into_iter().map(Arc::new));
        self
    }

    /// Gate for loading this action and its whole subtree.
    pub fn can_load<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(LoadParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.can_load = Some(boxed_hook(hook));
        self
    }

    /// Gate for the collect-data phase.
    pub fn can_collect_data<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(CollectParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.can_collect_data = Some(boxed_hook(hook));
        self
    }

    /// Produce this action's data; stored under the action name.
    pub fn collect_data<F, Fut, T>(mut self, hook: F) -> Self
    where
        F: Fn(CollectParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.collect_data = Some(Arc::new(move |params| {
            let pending = hook(params);
            async move {
                let value = pending.await?;
                serde_json::to_value(value).context("serialize collected data")
            }
            .boxed()
        }));
        self
    }

    /// Gate for the execute phase; sees the complete collected data.
    pub fn can_execute_action<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ExecuteGateParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.can_execute_action = Some(boxed_hook(hook));
        self
    }

    /// Main body; stages files through `params.files`.
    pub fn action<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(ActionParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.action = Some(boxed_hook(hook));
        self
    }

    /// Runs after the output collection has been flushed.
    pub fn post_write<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(PostWriteParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.post_write = Some(boxed_hook(hook));
        self
    }
}

fn boxed_hook<P, T, F, Fut>(hook: F) -> Hook<P, T>
where
    P: 'static,
    T: 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |params| hook(params).boxed())
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks: Vec<&str> = [
            ("can_load", self.can_load.is_some()),
            ("can_collect_data", self.can_collect_data.is_some()),
            ("collect_data", self.collect_data.is_some()),
            ("can_execute_action", self.can_execute_action.is_some()),
            ("action", self.action.is_some()),
            ("post_write", self.post_write.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect();
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("hooks", &hooks)
            .field("sub_actions", &self.sub_actions)
            .finish()
    }
}
