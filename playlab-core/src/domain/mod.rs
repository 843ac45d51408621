//! Domain types for the decision core.

pub mod action;
pub mod bar;
pub mod book;
pub mod factors;
pub mod ids;
pub mod position;
pub mod regime;
pub mod signal;
pub mod trade;

pub use action::{Action, TimedAction};
pub use bar::Bar;
pub use book::{BookLevel, OrderBookSnapshot};
pub use factors::{Factor, FactorVector};
pub use ids::{IdGen, PlaybookId, PositionId};
pub use position::{Phase, Position};
pub use regime::{RegimeAssignment, RegimeLabel};
pub use signal::{Direction, ProfitTarget, Signal};
pub use trade::{ClosedTrade, ExitReason};
