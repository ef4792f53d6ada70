use statefold_engine::Render;

use crate::domain::CounterState;

/// Plain-text view of the counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextView;

impl Render<CounterState> for TextView {
    type View = String;

    fn render(&self, state: &CounterState) -> String {
        format!("count: {}", state.count)
    }
}
