//! Post-match state validation and expiry flagging.

use ammbatch_types::{AmmbatchError, Height, Result, SwapMsgState};
use tracing::error;

/// Validate the flags of every request in `msgs` at `height`.
///
/// With `expire_now`, requests whose expiry is exactly `height` are flagged
/// for deletion so their remainder is refunded this batch.
pub fn validate_state_and_expire_orders(
    msgs: &mut [SwapMsgState],
    height: Height,
    expire_now: bool,
) -> Result<()> {
    for m in msgs.iter_mut() {
        if !m.executed {
            return Err(broken(m, "not executed"));
        }
        if m.remaining_offer_amount.is_zero() {
            if !m.succeeded || !m.to_be_deleted {
                return Err(broken(m, "filled request not closed"));
            }
            continue;
        }
        if height > m.order_expiry_height {
            if m.succeeded || !m.to_be_deleted {
                return Err(broken(m, "expired request still live"));
            }
            continue;
        }
        if expire_now && height == m.order_expiry_height {
            m.to_be_deleted = true;
        }
    }
    Ok(())
}

fn broken(m: &SwapMsgState, what: &str) -> AmmbatchError {
    error!(
        msg_index = %m.msg_index,
        executed = m.executed,
        succeeded = m.succeeded,
        to_be_deleted = m.to_be_deleted,
        expiry = m.order_expiry_height,
        "broken request state: {what}"
    );
    AmmbatchError::invariant(format!("request {}: {what}", m.msg_index))
}

#[cfg(test)]
mod tests {
    use ammbatch_types::OrderDirection;
    use rust_decimal::Decimal;

    use super::*;

    fn live(expiry: Height) -> SwapMsgState {
        let mut m = SwapMsgState::dummy(1, OrderDirection::XtoY, Decimal::ONE, Decimal::new(500, 0));
        m.executed = true;
        m.order_expiry_height = expiry;
        m
    }

    #[test]
    fn expires_only_when_asked_and_due() {
        let mut msgs = vec![live(5), live(6)];
        validate_state_and_expire_orders(&mut msgs, 5, false).unwrap();
        assert!(!msgs[0].to_be_deleted);

        validate_state_and_expire_orders(&mut msgs, 5, true).unwrap();
        assert!(msgs[0].to_be_deleted);
        assert!(!msgs[1].to_be_deleted);
    }

    #[test]
    fn unexecuted_is_fatal() {
        let mut m = live(5);
        m.executed = false;
        let err = validate_state_and_expire_orders(&mut [m], 5, false).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn filled_but_open_is_fatal() {
        let mut m = live(5);
        m.remaining_offer_amount = Decimal::ZERO;
        m.succeeded = true;
        assert!(validate_state_and_expire_orders(&mut [m.clone()], 5, true).is_err());

        m.to_be_deleted = true;
        assert!(validate_state_and_expire_orders(&mut [m], 5, true).is_ok());
    }

    #[test]
    fn past_expiry_must_be_flagged() {
        let m = live(3);
        assert!(validate_state_and_expire_orders(&mut [m.clone()], 5, false).is_err());

        let mut flagged = m;
        flagged.to_be_deleted = true;
        assert!(validate_state_and_expire_orders(&mut [flagged], 5, false).is_ok());
    }
}
