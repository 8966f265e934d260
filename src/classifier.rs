use crate::config::z_thresholds;
use crate::types::{DealTier, MarketModel, ScanEvent};

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// One notification-worthy finding, ready to render for delivery.
#[derive(Debug, Clone)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub price: i64,
    pub link: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertKind {
    /// A new listing that cleared a deal tier. Carries the model it was
    /// judged against so the message can show the baseline.
    Deal {
        tier: DealTier,
        model: Option<MarketModel>,
    },
    /// A stored listing re-observed cheaper. Always reported.
    PriceDrop { old_price: i64 },
}

impl Alert {
    /// Message body for delivery: tag line, price line, link line.
    pub fn render(&self) -> String {
        match &self.kind {
            AlertKind::Deal { tier: DealTier::FirstScan, .. } => format!(
                "🏁 *First scan*: {}\n💰 {}€\n🔗 {}",
                self.title, self.price, self.link
            ),
            AlertKind::Deal { tier, model: Some(model) } => {
                let saving = (model.mean - self.price as f64).max(0.0);
                format!(
                    "{} (-{saving:.0}€): {}\n💰 {}€ (avg {:.0}€)\n🔗 {}",
                    tier_tag(*tier),
                    self.title,
                    self.price,
                    model.mean,
                    self.link
                )
            }
            AlertKind::Deal { tier, model: None } => format!(
                "{}: {}\n💰 {}€\n🔗 {}",
                tier_tag(*tier),
                self.title,
                self.price,
                self.link
            ),
            AlertKind::PriceDrop { old_price } => format!(
                "📉 *Price drop*: {}\n💰 {}€ (was {old_price}€)\n🔗 {}",
                self.title, self.price, self.link
            ),
        }
    }
}

fn tier_tag(tier: DealTier) -> &'static str {
    match tier {
        DealTier::FirstScan => "🏁 *First scan*",
        DealTier::ImperativeDeal => "🔥 *Exceptional deal*",
        DealTier::StrongDeal => "💸 *Strong deal*",
        DealTier::GoodPrice => "✨ *Good price*",
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Deal tier for a newly stored listing, judged against the search's market
/// model. None means the price is unremarkable and stays silent.
pub fn classify_price(price: i64, model: Option<&MarketModel>) -> Option<DealTier> {
    let Some(model) = model else {
        return Some(DealTier::FirstScan);
    };
    if model.std_dev > 0.0 {
        let z = (price as f64 - model.mean) / model.std_dev;
        return if z <= z_thresholds::IMPERATIVE {
            Some(DealTier::ImperativeDeal)
        } else if z <= z_thresholds::STRONG {
            Some(DealTier::StrongDeal)
        } else if z <= z_thresholds::GOOD {
            Some(DealTier::GoodPrice)
        } else {
            None
        };
    }
    // Degenerate model: the trimmed sample collapsed to one price, so
    // z-scores are undefined. The raw lower quartile is the only floor left.
    ((price as f64) < model.lower_quartile).then_some(DealTier::GoodPrice)
}

/// Map a reconciliation event to an alert, or to silence.
/// Price drops always alert; removals never do.
pub fn classify_event(event: &ScanEvent, model: Option<&MarketModel>) -> Option<Alert> {
    match event {
        ScanEvent::New(candidate) => {
            let tier = classify_price(candidate.price, model)?;
            Some(Alert {
                kind: AlertKind::Deal {
                    tier,
                    model: model.copied(),
                },
                title: candidate.title.clone(),
                price: candidate.price,
                link: candidate.link.clone(),
            })
        }
        ScanEvent::PriceDrop { candidate, old_price } => Some(Alert {
            kind: AlertKind::PriceDrop {
                old_price: *old_price,
            },
            title: candidate.title.clone(),
            price: candidate.price,
            link: candidate.link.clone(),
        }),
        ScanEvent::Removed { .. } => None,
    }
}
