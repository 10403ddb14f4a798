//! Coupon Condition

use crate::{
    conditions::{Condition, ConditionKind, Met},
    context::DealContext,
    error::DealError,
    ids::DealId,
};

/// Met when the customer holds a valid coupon bound to the deal.
#[derive(Debug, Clone)]
pub struct HasCouponCondition {
    deal: DealId,
}

impl HasCouponCondition {
    /// Create for the deal that owns this condition.
    pub fn new(deal: DealId) -> Self {
        Self { deal }
    }
}

impl Condition for HasCouponCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::HasCoupon
    }

    fn met(&self, ctx: &DealContext<'_>) -> Result<Met, DealError> {
        Ok(Met::Bool(
            ctx.coupons.has_valid_coupon_for(&self.deal, ctx.clock.now()),
        ))
    }

    fn description(&self) -> String {
        "Enter a coupon code".to_string()
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{coupons::Coupon, fixtures::Storefront};

    use super::*;

    #[test]
    fn met_only_with_a_valid_coupon_for_the_deal() -> TestResult {
        let deal = DealId::new("welcome");
        let condition = HasCouponCondition::new(deal.clone());
        let mut store = Storefront::new(USD);

        assert!(!condition.met(&store.context())?.is_met());

        store.coupons.add(Coupon::new("OTHER", DealId::new("other")))?;
        assert!(!condition.met(&store.context())?.is_met());

        store.coupons.add(Coupon::new("WELCOME", deal))?;
        assert!(condition.met(&store.context())?.is_met());

        Ok(())
    }

    #[test]
    fn expired_coupon_is_unmet() -> TestResult {
        let deal = DealId::new("welcome");
        let mut store = Storefront::new(USD);
        let expired = Coupon::new("OLD", deal.clone())
            .valid_between(None, Some("2000-01-01T00:00:00Z".parse()?));

        store.coupons.add(expired)?;

        assert!(!HasCouponCondition::new(deal).met(&store.context())?.is_met());

        Ok(())
    }

    #[test]
    fn adding_units_never_almost_meets() -> TestResult {
        let mut store = Storefront::new(USD);

        assert!(!HasCouponCondition::new(DealId::new("welcome")).almost_met(&mut store.context())?);

        Ok(())
    }
}
