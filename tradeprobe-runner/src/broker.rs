//! Simulated broker: fills every order in full at the last close seen for
//! its symbol.

use std::collections::HashMap;
use std::sync::Arc;
use tradeprobe_core::domain::{Event, FillEvent};
use tradeprobe_core::engine::{EventBus, HandlerError, Observer};

use crate::config::BrokerConfig;

pub struct SimulatedBroker {
    bus: Arc<EventBus>,
    commission_per_share: f64,
    min_commission: f64,
    last_close: HashMap<String, f64>,
    fills_sent: usize,
}

impl SimulatedBroker {
    pub fn new(bus: Arc<EventBus>, config: &BrokerConfig) -> Self {
        Self {
            bus,
            commission_per_share: config.commission_per_share,
            min_commission: config.min_commission,
            last_close: HashMap::new(),
            fills_sent: 0,
        }
    }

    /// Per-share commission with a floor. Empty orders cost nothing.
    pub fn commission_for(&self, quantity: i64) -> f64 {
        if quantity == 0 {
            return 0.0;
        }
        (quantity as f64 * self.commission_per_share).max(self.min_commission)
    }

    pub fn fills_sent(&self) -> usize {
        self.fills_sent
    }
}

impl Observer for SimulatedBroker {
    fn handle(&mut self, event: &Event) -> Result<(), HandlerError> {
        match event {
            Event::Market(bar) if !bar.is_void() => {
                self.last_close.insert(bar.symbol.clone(), bar.close);
            }
            Event::Order(order) => {
                let price = self.last_close.get(order.symbol()).copied().ok_or_else(|| {
                    HandlerError::new(format!("no price seen yet for '{}'", order.symbol()))
                })?;
                let fill = FillEvent::new(
                    order.timestamp(),
                    order.symbol(),
                    order.quantity(),
                    order.direction(),
                    price,
                    self.commission_for(order.quantity()),
                )?;
                self.bus.publish(fill)?;
                self.fills_sent += 1;
            }
            _ => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated_broker"
    }
}
