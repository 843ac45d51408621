//! Order-flow exits: imbalance reversal and large opposing resting orders.

use crate::domain::{Direction, ExitReason, Position};
use crate::microstructure::MicrostructureFeatures;

use super::params::OrderFlowExitParams;

/// Exit reason if order flow turned against the position.
///
/// Armed once MFE reaches `min_mfe_r`. Needs an available snapshot; absence
/// never triggers an exit.
pub fn check(
    position: &Position,
    micro: &MicrostructureFeatures,
    params: &OrderFlowExitParams,
) -> Option<ExitReason> {
    if !params.enabled || !micro.is_available() || position.mfe < params.min_mfe_r {
        return None;
    }

    let adverse = -position.direction.sign() * micro.order_flow_imbalance;
    if adverse > 0.0 && adverse >= params.reversal_threshold {
        return Some(ExitReason::OfiReversal);
    }

    if params.exit_on_large_order {
        // a wall on the side that favorable movement has to trade through
        let wall = match position.direction {
            Direction::Long => micro.large_orders.any_ask(),
            Direction::Short => micro.large_orders.any_bid(),
        };
        if wall {
            return Some(ExitReason::LargeOrderWall);
        }
    }
    None
}
