//! Declarative render output with handlers bound to controls.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use vellum_content::{ActionRow, ButtonStyle, Component, Embed, MessageContent, SelectOption};

use super::error::ViewError;
use super::instance::{LiveView, ViewInstance};
use super::View;
use crate::domain::Interaction;
use crate::runtime::Connector;

/// Boxed control handler for a view of type `V`.
pub type Handler<V> = Arc<
    dyn Fn(HandlerContext<V>) -> BoxFuture<'static, Result<HandlerOutcome<V>, ViewError>>
        + Send
        + Sync,
>;

/// Owned inputs handed to a handler. Nothing here borrows the live view.
pub struct HandlerContext<V: View> {
    pub props: Arc<V>,
    pub state: V::State,
    pub interaction: Interaction,
    /// Selected values for select menus; empty for buttons.
    pub values: Vec<String>,
    pub connector: Arc<dyn Connector>,
}

impl<V: View> HandlerContext<V> {
    /// Ephemeral message to the interacting user.
    pub async fn notify(&self, text: &str) -> Result<(), ViewError> {
        self.connector.notify(&self.interaction, text).await?;
        Ok(())
    }
}

pub enum HandlerOutcome<V: View> {
    Unchanged,
    SetState(V::State),
    /// Replace the live view with another one on the same message.
    Transition(Box<dyn LiveView>),
}

impl<V: View> HandlerOutcome<V> {
    pub fn set(state: V::State) -> Self {
        Self::SetState(state)
    }

    pub fn transition<W: View>(props: W) -> Self {
        Self::Transition(Box::new(ViewInstance::new(props)))
    }
}

fn boxed<V, F, Fut>(f: F) -> Handler<V>
where
    V: View,
    F: Fn(HandlerContext<V>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerOutcome<V>, ViewError>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

pub struct Button<V: View> {
    label: String,
    style: ButtonStyle,
    emoji: Option<String>,
    disabled: bool,
    handler: Option<Handler<V>>,
}

impl<V: View> Button<V> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            style: ButtonStyle::Secondary,
            emoji: None,
            disabled: false,
            handler: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn on_click<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerContext<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome<V>, ViewError>> + Send + 'static,
    {
        self.handler = Some(boxed(f));
        self
    }
}

pub struct Select<V: View> {
    placeholder: Option<String>,
    options: Vec<SelectOption>,
    min_values: u8,
    max_values: u8,
    disabled: bool,
    handler: Option<Handler<V>>,
}

impl<V: View> Select<V> {
    pub fn new(options: Vec<SelectOption>) -> Self {
        Self {
            placeholder: None,
            options,
            min_values: 1,
            max_values: 1,
            disabled: false,
            handler: None,
        }
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn range(mut self, min_values: u8, max_values: u8) -> Self {
        self.min_values = min_values;
        self.max_values = max_values.max(min_values);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn on_select<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HandlerContext<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome<V>, ViewError>> + Send + 'static,
    {
        self.handler = Some(boxed(f));
        self
    }
}

pub enum Control<V: View> {
    Button(Button<V>),
    Link { label: String, url: String },
    Select(Select<V>),
}

pub struct Row<V: View> {
    controls: Vec<Control<V>>,
}

impl<V: View> Default for Row<V> {
    fn default() -> Self {
        Self {
            controls: Vec::new(),
        }
    }
}

impl<V: View> Row<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(mut self, button: Button<V>) -> Self {
        self.controls.push(Control::Button(button));
        self
    }

    pub fn link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.controls.push(Control::Link {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    pub fn select(mut self, select: Select<V>) -> Self {
        self.controls.push(Control::Select(select));
        self
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// What a view's `render` returns.
pub struct Frame<V: View> {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub rows: Vec<Row<V>>,
    pub ephemeral: bool,
}

impl<V: View> Default for Frame<V> {
    fn default() -> Self {
        Self {
            content: None,
            embeds: Vec::new(),
            rows: Vec::new(),
            ephemeral: false,
        }
    }
}

impl<V: View> Frame<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn row(mut self, row: Row<V>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Flatten into wire content, assigning `"{generation}:{index}"` ids to
    /// every custom-id control in row-major order. The returned handlers are
    /// indexed the same way.
    pub(crate) fn lower(self, generation: u64) -> (MessageContent, Vec<Option<Handler<V>>>) {
        let mut handlers = Vec::new();
        let mut next_id = |handler: Option<Handler<V>>| {
            let id = format!("{generation}:{}", handlers.len());
            handlers.push(handler);
            id
        };

        let components = self
            .rows
            .into_iter()
            .map(|row| {
                let components = row
                    .controls
                    .into_iter()
                    .map(|control| match control {
                        Control::Button(button) => Component::Button {
                            custom_id: Some(next_id(button.handler)),
                            url: None,
                            label: button.label,
                            style: button.style,
                            emoji: button.emoji,
                            disabled: button.disabled,
                        },
                        Control::Link { label, url } => Component::link(label, url),
                        Control::Select(select) => Component::StringSelect {
                            custom_id: next_id(select.handler),
                            placeholder: select.placeholder,
                            options: select.options,
                            min_values: select.min_values,
                            max_values: select.max_values,
                            disabled: select.disabled,
                        },
                    })
                    .collect();
                ActionRow::new(components)
            })
            .collect();

        let content = MessageContent {
            content: self.content,
            embeds: self.embeds,
            components,
            ephemeral: self.ephemeral,
        };
        (content, handlers)
    }
}
