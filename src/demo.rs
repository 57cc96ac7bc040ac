//! Sample views used by the `demo` command and the integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vellum_content::{ButtonStyle, Embed, SelectOption};

use crate::runtime::{CommandContext, CommandHandler, ViewRuntimeBuilder};
use crate::view::{Button, Frame, HandlerContext, HandlerOutcome, Row, Select, View, ViewError};
use crate::domain::CommandKind;

pub const COUNTER_COMMAND: &str = "counter";
const STEPS: [i64; 3] = [1, 5, 10];

/// A shared tally with increment, decrement and step controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counter {
    pub title: String,
}

impl Counter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
    pub step: i64,
    pub clicks: u32,
}

impl Default for CounterState {
    fn default() -> Self {
        Self {
            count: 0,
            step: 1,
            clicks: 0,
        }
    }
}

impl CounterState {
    fn bump(&self, direction: i64) -> Self {
        Self {
            count: self
                .count
                .saturating_add(direction.saturating_mul(self.step)),
            step: self.step,
            clicks: self.clicks.saturating_add(1),
        }
    }
}

#[async_trait]
impl View for Counter {
    type State = CounterState;
    const TYPE_ID: &'static str = "demo.counter";

    fn initial_state(&self) -> Self::State {
        CounterState::default()
    }

    async fn render(&self, state: &Self::State) -> Result<Frame<Self>, ViewError> {
        let steps = STEPS
            .iter()
            .map(|step| {
                let mut option = SelectOption::new(format!("Step {step}"), step.to_string());
                option.default = *step == state.step;
                option
            })
            .collect();

        Ok(Frame::new()
            .content(format!("**{}**", self.title))
            .embed(
                Embed::new()
                    .title("Count")
                    .description(state.count.to_string())
                    .field("Clicks", state.clicks.to_string(), true)
                    .field("Step", state.step.to_string(), true),
            )
            .row(
                Row::new()
                    .button(Button::new("-").on_click(|ctx: HandlerContext<Self>| async move {
                        Ok(HandlerOutcome::set(ctx.state.bump(-1)))
                    }))
                    .button(Button::new("+").style(ButtonStyle::Primary).on_click(
                        |ctx: HandlerContext<Self>| async move { Ok(HandlerOutcome::set(ctx.state.bump(1))) },
                    ))
                    .button(Button::new("Finish").style(ButtonStyle::Success).on_click(
                        |ctx: HandlerContext<Self>| async move {
                            Ok(HandlerOutcome::transition(Summary {
                                title: ctx.props.title.clone(),
                                total: ctx.state.count,
                                clicks: ctx.state.clicks,
                            }))
                        },
                    )),
            )
            .row(
                Row::new().select(Select::new(steps).placeholder("Step size").on_select(
                    |ctx: HandlerContext<Self>| async move {
                        let Some(step) = ctx.values.first().and_then(|v| v.parse::<i64>().ok())
                        else {
                            ctx.notify("Pick one of the listed steps.").await?;
                            return Ok(HandlerOutcome::Unchanged);
                        };
                        if step == ctx.state.step {
                            return Ok(HandlerOutcome::Unchanged);
                        }
                        let mut state = ctx.state;
                        state.step = step;
                        Ok(HandlerOutcome::set(state))
                    },
                )),
            ))
    }
}

/// Final tally left behind when a counter is finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub title: String,
    pub total: i64,
    pub clicks: u32,
}

#[async_trait]
impl View for Summary {
    type State = ();
    const TYPE_ID: &'static str = "demo.summary";

    fn initial_state(&self) -> Self::State {}

    async fn render(&self, _state: &Self::State) -> Result<Frame<Self>, ViewError> {
        Ok(Frame::new()
            .content(format!("**{}** is closed", self.title))
            .embed(
                Embed::new()
                    .title("Total")
                    .description(self.total.to_string())
                    .footer(format!("{} clicks", self.clicks)),
            )
            .row(Row::new().button(Button::new("Start over").on_click(
                |ctx: HandlerContext<Self>| async move { Ok(HandlerOutcome::transition(Counter::new(ctx.props.title.clone()))) },
            ))))
    }
}

/// `/counter [title]` replies with a fresh [`Counter`].
pub struct CounterCommand;

#[async_trait]
impl CommandHandler for CounterCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<(), ViewError> {
        let title = ctx.options.string("title")?.unwrap_or("Counter");
        ctx.runtime
            .reply(&ctx.interaction, Counter::new(title))
            .await?;
        Ok(())
    }
}

/// Register the demo pages and command on `builder`.
pub fn install(builder: ViewRuntimeBuilder) -> ViewRuntimeBuilder {
    builder
        .page::<Counter>()
        .page::<Summary>()
        .command(CommandKind::Chat, COUNTER_COMMAND, Arc::new(CounterCommand))
}
