use super::{Order, OrderItem};

/// Creation time baked into the fixture (2020-09-13T12:26:40Z).
pub const FIXTURE_CREATED_ON: i64 = 1_600_000_000;

/// The order every codec is measured against.
#[must_use]
pub fn build() -> Order {
    build_at(FIXTURE_CREATED_ON)
}

/// Same fixture with a caller-chosen creation time. Used by the runner's
/// `--live-timestamp` mode, which stamps the order once at startup.
#[must_use]
pub fn build_at(created_on: i64) -> Order {
    Order {
        id: "101".to_owned(),
        status: "Created".to_owned(),
        created_on,
        order_items: vec![
            OrderItem {
                code: "knd100".to_owned(),
                name: "Kindle Voyage".to_owned(),
                unit_price: 220.0,
                quantity: 1,
            },
            OrderItem {
                code: "kc101".to_owned(),
                name: "Kindle Voyage SmartShell Case".to_owned(),
                unit_price: 10.0,
                quantity: 2,
            },
        ],
    }
}
