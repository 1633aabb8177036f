//! Out-of-turn phone transactions: shop, loans, gray tasks, contacts, inbox.
//!
//! Every transaction either returns a new ledger and a receipt, or a
//! rejection with the ledger untouched. Stat changes go through
//! [`apply_delta`] like any turn.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::LOG_PHONE;
use crate::data::Catalog;
use crate::numbers::{floor_f64_to_i64, whole_units};
use crate::state::Ledger;
use crate::stats::{Requirements, StatDelta, StatKey, apply_delta};

/// Balance knobs for the phone apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneConfig {
    #[serde(default = "PhoneConfig::default_loan_offers")]
    pub loan_offers: Vec<u32>,
    /// Debt added per unit borrowed.
    #[serde(default = "PhoneConfig::default_loan_markup")]
    pub loan_markup: f64,
    #[serde(default = "PhoneConfig::default_gray_task_savviness")]
    pub gray_task_savviness: f64,
    #[serde(default = "PhoneConfig::default_gray_task_mood_cost")]
    pub gray_task_mood_cost: f64,
    #[serde(default = "PhoneConfig::default_video_mood_gain")]
    pub video_mood_gain: f64,
    #[serde(default = "PhoneConfig::default_video_stamina_cost")]
    pub video_stamina_cost: f64,
    #[serde(default = "PhoneConfig::default_livestream_min_stamina")]
    pub livestream_min_stamina: f64,
    #[serde(default = "PhoneConfig::default_livestream_income")]
    pub livestream_income: f64,
    #[serde(default = "PhoneConfig::default_livestream_stamina_cost")]
    pub livestream_stamina_cost: f64,
    #[serde(default = "PhoneConfig::default_livestream_sin")]
    pub livestream_sin: f64,
    #[serde(default = "PhoneConfig::default_livestream_mood_cost")]
    pub livestream_mood_cost: f64,
}

impl PhoneConfig {
    fn default_loan_offers() -> Vec<u32> {
        vec![1_000, 5_000]
    }

    const fn default_loan_markup() -> f64 {
        1.5
    }

    const fn default_gray_task_savviness() -> f64 {
        5.0
    }

    const fn default_gray_task_mood_cost() -> f64 {
        15.0
    }

    const fn default_video_mood_gain() -> f64 {
        10.0
    }

    const fn default_video_stamina_cost() -> f64 {
        5.0
    }

    const fn default_livestream_min_stamina() -> f64 {
        30.0
    }

    const fn default_livestream_income() -> f64 {
        200.0
    }

    const fn default_livestream_stamina_cost() -> f64 {
        30.0
    }

    const fn default_livestream_sin() -> f64 {
        5.0
    }

    const fn default_livestream_mood_cost() -> f64 {
        10.0
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `PhoneConfigError` when the loan table is empty or an amount is negative.
    pub fn validate(&self) -> Result<(), PhoneConfigError> {
        if self.loan_offers.is_empty() || self.loan_offers.contains(&0) {
            return Err(PhoneConfigError::InvalidLoanOffers);
        }
        if !(self.loan_markup >= 1.0 && self.loan_markup.is_finite()) {
            return Err(PhoneConfigError::MinViolation {
                field: "loan_markup",
                min: 1.0,
                value: self.loan_markup,
            });
        }
        for (field, value) in [
            ("gray_task_savviness", self.gray_task_savviness),
            ("gray_task_mood_cost", self.gray_task_mood_cost),
            ("video_mood_gain", self.video_mood_gain),
            ("video_stamina_cost", self.video_stamina_cost),
            ("livestream_min_stamina", self.livestream_min_stamina),
            ("livestream_income", self.livestream_income),
            ("livestream_stamina_cost", self.livestream_stamina_cost),
            ("livestream_sin", self.livestream_sin),
            ("livestream_mood_cost", self.livestream_mood_cost),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(PhoneConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            loan_offers: Self::default_loan_offers(),
            loan_markup: Self::default_loan_markup(),
            gray_task_savviness: Self::default_gray_task_savviness(),
            gray_task_mood_cost: Self::default_gray_task_mood_cost(),
            video_mood_gain: Self::default_video_mood_gain(),
            video_stamina_cost: Self::default_video_stamina_cost(),
            livestream_min_stamina: Self::default_livestream_min_stamina(),
            livestream_income: Self::default_livestream_income(),
            livestream_stamina_cost: Self::default_livestream_stamina_cost(),
            livestream_sin: Self::default_livestream_sin(),
            livestream_mood_cost: Self::default_livestream_mood_cost(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PhoneConfigError {
    #[error("loan_offers must list at least one positive amount")]
    InvalidLoanOffers,
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
}

/// A single phone action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Transaction {
    Purchase(String),
    Borrow(u32),
    GrayTask(String),
    Contact(String),
    WatchVideos,
    Livestream,
    ReadMessage(String),
}

/// Why a transaction was refused. The ledger is never touched on rejection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransactionRejected {
    #[error("no listing with id {0}")]
    UnknownListing(String),
    #[error("{0} is not an available loan amount")]
    UnofferedLoan(u32),
    #[error("needs {required} money but only {available} on hand")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("{stat} must be at least {required} (currently {actual})")]
    RequirementUnmet {
        stat: StatKey,
        required: f64,
        actual: f64,
    },
    #[error("a crackdown is in force")]
    Crackdown,
}

/// What an accepted transaction did.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub summary: String,
    pub delta: StatDelta,
}

fn check(requires: &Requirements, ledger: &Ledger) -> Result<(), TransactionRejected> {
    match requires.unmet(&ledger.stats).into_iter().next() {
        Some(unmet) => Err(TransactionRejected::RequirementUnmet {
            stat: unmet.stat,
            required: unmet.required,
            actual: unmet.actual,
        }),
        None => Ok(()),
    }
}

fn purchase(ledger: &Ledger, id: &str, catalog: &Catalog) -> Result<Receipt, TransactionRejected> {
    let product = catalog
        .product(id)
        .ok_or_else(|| TransactionRejected::UnknownListing(id.to_string()))?;
    let price = f64::from(product.price);
    if ledger.stats.money < price {
        return Err(TransactionRejected::InsufficientFunds {
            required: price,
            available: ledger.stats.money,
        });
    }
    Ok(Receipt {
        summary: format!("Bought {} for {}", product.name, product.price),
        delta: product.impact.clone().with(StatKey::Money, -price),
    })
}

fn quote(
    ledger: &Ledger,
    tx: &Transaction,
    catalog: &Catalog,
    cfg: &PhoneConfig,
) -> Result<Receipt, TransactionRejected> {
    match tx {
        Transaction::Purchase(id) => purchase(ledger, id, catalog),
        Transaction::Borrow(amount) => {
            if !cfg.loan_offers.contains(amount) {
                return Err(TransactionRejected::UnofferedLoan(*amount));
            }
            let principal = f64::from(*amount);
            let owed = whole_units(principal * cfg.loan_markup);
            Ok(Receipt {
                summary: format!("Borrowed {amount}, owing {}", floor_f64_to_i64(owed)),
                delta: StatDelta::new()
                    .with(StatKey::Money, principal)
                    .with(StatKey::Debt, owed),
            })
        }
        Transaction::GrayTask(id) => {
            if ledger.flags.is_crackdown {
                return Err(TransactionRejected::Crackdown);
            }
            check(
                &Requirements::new().at_least(StatKey::Savviness, cfg.gray_task_savviness),
                ledger,
            )?;
            let task = catalog
                .gray_task(id)
                .ok_or_else(|| TransactionRejected::UnknownListing(id.clone()))?;
            Ok(Receipt {
                summary: format!("Finished {} for {}", task.name, task.reward),
                delta: task
                    .impact
                    .clone()
                    .with(StatKey::Money, f64::from(task.reward))
                    .with(StatKey::Mood, -cfg.gray_task_mood_cost),
            })
        }
        Transaction::Contact(id) => {
            let contact = catalog
                .contact(id)
                .ok_or_else(|| TransactionRejected::UnknownListing(id.clone()))?;
            check(&contact.requires, ledger)?;
            Ok(Receipt {
                summary: format!("Met {}", contact.name),
                delta: contact.impact.clone(),
            })
        }
        Transaction::WatchVideos => Ok(Receipt {
            summary: "Scrolled short videos".to_string(),
            delta: StatDelta::new()
                .with(StatKey::Mood, cfg.video_mood_gain)
                .with(StatKey::Stamina, -cfg.video_stamina_cost),
        }),
        Transaction::Livestream => {
            check(
                &Requirements::new().at_least(StatKey::Stamina, cfg.livestream_min_stamina),
                ledger,
            )?;
            Ok(Receipt {
                summary: "Went live for strangers".to_string(),
                delta: StatDelta::new()
                    .with(StatKey::Money, cfg.livestream_income)
                    .with(StatKey::Stamina, -cfg.livestream_stamina_cost)
                    .with(StatKey::Sin, cfg.livestream_sin)
                    .with(StatKey::Mood, -cfg.livestream_mood_cost),
            })
        }
        Transaction::ReadMessage(id) => {
            let message = catalog
                .message(id)
                .ok_or_else(|| TransactionRejected::UnknownListing(id.clone()))?;
            let delta = if ledger.read_messages.contains(id) {
                StatDelta::new()
            } else {
                message.impact.clone()
            };
            Ok(Receipt {
                summary: format!("Read a message from {}", message.sender),
                delta,
            })
        }
    }
}

/// Apply a phone transaction out of turn.
///
/// # Errors
///
/// Returns `TransactionRejected` when the listing is unknown, the player
/// cannot afford it, a requirement is unmet, or a crackdown blocks it.
pub fn apply_transaction(
    ledger: &Ledger,
    tx: &Transaction,
    catalog: &Catalog,
    cfg: &PhoneConfig,
) -> Result<(Ledger, Receipt), TransactionRejected> {
    let receipt = quote(ledger, tx, catalog, cfg).inspect_err(|err| {
        log::debug!(target: LOG_PHONE, "rejected {tx:?}: {err}");
    })?;
    let mut next = ledger.with_stats(apply_delta(&ledger.stats, &receipt.delta));
    if let Transaction::ReadMessage(id) = tx {
        next.read_messages.insert(id.clone());
    }
    log::debug!(target: LOG_PHONE, "{}", receipt.summary);
    Ok((next, receipt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Contact, GrayTask, InboxMessage, Product};
    use crate::stats::Stats;

    fn catalog() -> Catalog {
        Catalog {
            products: vec![Product {
                id: "noodles".to_string(),
                name: "Instant noodles".to_string(),
                price: 5,
                description: String::new(),
                impact: StatDelta::new().with(StatKey::Satiety, 20.0),
            }],
            gray_tasks: vec![GrayTask {
                id: "courier".to_string(),
                name: "Night courier".to_string(),
                reward: 500,
                description: String::new(),
                risk: "high".to_string(),
                impact: StatDelta::new().with(StatKey::Sin, 10.0),
            }],
            contacts: vec![Contact {
                id: "boss".to_string(),
                name: "Businessman".to_string(),
                distance: "2km".to_string(),
                bio: String::new(),
                impact: StatDelta::new().with(StatKey::Money, 1_000.0),
                requires: Requirements::new().at_least(StatKey::Appearance, 8.0),
            }],
            messages: vec![InboxMessage {
                id: "m1".to_string(),
                sender: "Mom".to_string(),
                content: "Eat something warm.".to_string(),
                time: "07:00".to_string(),
                impact: StatDelta::new().with(StatKey::Mood, 5.0),
            }],
            ..Catalog::default()
        }
    }

    fn ledger() -> Ledger {
        Ledger::default().with_stats(Stats {
            money: 100.0,
            mood: 50.0,
            stamina: 50.0,
            savviness: 6.0,
            appearance: 5.0,
            ..Stats::default()
        })
    }

    #[test]
    fn purchase_spends_money_and_applies_product() {
        let (next, receipt) = apply_transaction(
            &ledger(),
            &Transaction::Purchase("noodles".to_string()),
            &catalog(),
            &PhoneConfig::default(),
        )
        .unwrap();
        assert!((next.stats.money - 95.0).abs() < f64::EPSILON);
        assert!((next.stats.satiety - 20.0).abs() < f64::EPSILON);
        assert_eq!(receipt.delta.get(StatKey::Money), Some(-5.0));
    }

    #[test]
    fn purchase_rejected_without_funds() {
        let broke = ledger().with_stats(Stats::default());
        let err = apply_transaction(
            &broke,
            &Transaction::Purchase("noodles".to_string()),
            &catalog(),
            &PhoneConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TransactionRejected::InsufficientFunds { .. }));
    }

    #[test]
    fn borrow_adds_marked_up_debt() {
        let cfg = PhoneConfig::default();
        let (next, _) =
            apply_transaction(&ledger(), &Transaction::Borrow(1_000), &catalog(), &cfg).unwrap();
        assert!((next.stats.money - 1_100.0).abs() < f64::EPSILON);
        assert!((next.stats.debt - 1_500.0).abs() < f64::EPSILON);
        assert_eq!(
            apply_transaction(&ledger(), &Transaction::Borrow(777), &catalog(), &cfg),
            Err(TransactionRejected::UnofferedLoan(777))
        );
    }

    #[test]
    fn gray_task_blocked_by_crackdown_and_savviness() {
        let cfg = PhoneConfig::default();
        let task = Transaction::GrayTask("courier".to_string());
        let (next, _) = apply_transaction(&ledger(), &task, &catalog(), &cfg).unwrap();
        assert!((next.stats.money - 600.0).abs() < f64::EPSILON);
        assert!((next.stats.mood - 35.0).abs() < f64::EPSILON);
        assert!((next.stats.sin - 10.0).abs() < f64::EPSILON);

        let mut watched = ledger();
        watched.flags.is_crackdown = true;
        assert_eq!(
            apply_transaction(&watched, &task, &catalog(), &cfg),
            Err(TransactionRejected::Crackdown)
        );

        let naive = ledger().with_stats(Stats {
            savviness: 2.0,
            ..ledger().stats
        });
        assert!(matches!(
            apply_transaction(&naive, &task, &catalog(), &cfg),
            Err(TransactionRejected::RequirementUnmet {
                stat: StatKey::Savviness,
                ..
            })
        ));
    }

    #[test]
    fn contact_respects_its_requirements() {
        let cfg = PhoneConfig::default();
        let meet = Transaction::Contact("boss".to_string());
        assert!(apply_transaction(&ledger(), &meet, &catalog(), &cfg).is_err());
        let striking = ledger().with_stats(Stats {
            appearance: 8.0,
            ..ledger().stats
        });
        let (next, _) = apply_transaction(&striking, &meet, &catalog(), &cfg).unwrap();
        assert!((next.stats.money - 1_100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn livestream_needs_stamina() {
        let cfg = PhoneConfig::default();
        let (next, _) =
            apply_transaction(&ledger(), &Transaction::Livestream, &catalog(), &cfg).unwrap();
        assert!((next.stats.stamina - 20.0).abs() < f64::EPSILON);
        assert!(apply_transaction(&next, &Transaction::Livestream, &catalog(), &cfg).is_err());
    }

    #[test]
    fn videos_trade_stamina_for_mood() {
        let (next, _) = apply_transaction(
            &ledger(),
            &Transaction::WatchVideos,
            &catalog(),
            &PhoneConfig::default(),
        )
        .unwrap();
        assert!((next.stats.mood - 60.0).abs() < f64::EPSILON);
        assert!((next.stats.stamina - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn message_effect_applies_once() {
        let cfg = PhoneConfig::default();
        let read = Transaction::ReadMessage("m1".to_string());
        let (once, _) = apply_transaction(&ledger(), &read, &catalog(), &cfg).unwrap();
        let (twice, receipt) = apply_transaction(&once, &read, &catalog(), &cfg).unwrap();
        assert!((twice.stats.mood - 55.0).abs() < f64::EPSILON);
        assert!(receipt.delta.is_empty());
        assert!(twice.read_messages.contains("m1"));
    }

    #[test]
    fn unknown_listing_is_rejected_without_mutation() {
        let start = ledger();
        let result = apply_transaction(
            &start,
            &Transaction::Purchase("caviar".to_string()),
            &catalog(),
            &PhoneConfig::default(),
        );
        assert_eq!(
            result,
            Err(TransactionRejected::UnknownListing("caviar".to_string()))
        );
    }

    #[test]
    fn default_config_is_valid() {
        assert!(PhoneConfig::default().validate().is_ok());
        let cfg = PhoneConfig {
            loan_offers: Vec::new(),
            ..PhoneConfig::default()
        };
        assert_eq!(cfg.validate(), Err(PhoneConfigError::InvalidLoanOffers));
    }
}
