//! Ledger and shop transitions
//!
//! Every function here is a check-then-mutate on one player record. Checks run
//! before the first write, so a rejected call leaves the record untouched.

use crate::{
    config::EconomyConfig,
    errors::{EconomyError, MinestarsResult},
    player::Player,
    torch,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyClaim {
    /// Pickaxes credited by this call; 0 when today's grant was already taken
    pub granted: u64,
    pub stone_pickaxes: u64,
}

pub fn claim_daily(player: &mut Player, today: NaiveDate, config: &EconomyConfig) -> DailyClaim {
    if player.last_daily_claim == Some(today) {
        return DailyClaim {
            granted: 0,
            stone_pickaxes: player.stone_pickaxes,
        };
    }

    player.stone_pickaxes = player.stone_pickaxes.saturating_add(config.daily_stone_pickaxes);
    player.last_daily_claim = Some(today);
    debug!(player_id = player.id, %today, "Daily pickaxes granted");

    DailyClaim {
        granted: config.daily_stone_pickaxes,
        stone_pickaxes: player.stone_pickaxes,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondPickaxePurchase {
    pub stars: u64,
    pub diamond_pickaxes: u64,
}

pub fn buy_diamond_pickaxe(player: &mut Player, config: &EconomyConfig) -> MinestarsResult<DiamondPickaxePurchase> {
    debit_stars(player, config.diamond_pickaxe_cost)?;
    player.diamond_pickaxes = player.diamond_pickaxes.saturating_add(1);

    Ok(DiamondPickaxePurchase {
        stars: player.stars,
        diamond_pickaxes: player.diamond_pickaxes,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeDirection {
    RubiesToStars,
    StarsToRubies,
}

impl fmt::Display for ExchangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeDirection::RubiesToStars => write!(f, "rubies_to_stars"),
            ExchangeDirection::StarsToRubies => write!(f, "stars_to_rubies"),
        }
    }
}

impl FromStr for ExchangeDirection {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rubies_to_stars" => Ok(ExchangeDirection::RubiesToStars),
            "stars_to_rubies" => Ok(ExchangeDirection::StarsToRubies),
            other => Err(EconomyError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeResult {
    pub rubies: u64,
    pub stars: u64,
    /// Units removed from the source balance
    pub debited: u64,
    /// Units added to the destination balance
    pub credited: u64,
}

/// Convert `amount` units of the source currency.
///
/// Buying stars only consumes whole multiples of `rubies_per_star`; the
/// remainder stays in the ruby balance.
pub fn exchange(
    player: &mut Player,
    direction: ExchangeDirection,
    amount: u64,
    config: &EconomyConfig,
) -> MinestarsResult<ExchangeResult> {
    let (debited, credited) = match direction {
        ExchangeDirection::RubiesToStars => {
            let stars = amount / config.rubies_per_star;
            (stars * config.rubies_per_star, stars)
        }
        ExchangeDirection::StarsToRubies => (amount, amount.saturating_mul(config.stars_to_rubies_rate)),
    };
    if credited == 0 {
        return Err(EconomyError::AmountTooSmall { amount });
    }

    let available = match direction {
        ExchangeDirection::RubiesToStars => player.rubies,
        ExchangeDirection::StarsToRubies => player.stars,
    };
    if available < amount {
        return Err(EconomyError::InsufficientBalance {
            needed: amount,
            available,
        });
    }

    match direction {
        ExchangeDirection::RubiesToStars => {
            player.rubies -= debited;
            player.stars = player.stars.saturating_add(credited);
        }
        ExchangeDirection::StarsToRubies => {
            player.stars -= debited;
            player.rubies = player.rubies.saturating_add(credited);
        }
    }
    debug!(player_id = player.id, %direction, debited, credited, "Exchange applied");

    Ok(ExchangeResult {
        rubies: player.rubies,
        stars: player.stars,
        debited,
        credited,
    })
}

/// Permanent upgrades sold for stars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    ReferralBoost,
    EternalTorch,
}

impl ShopItem {
    pub fn cost(self, config: &EconomyConfig) -> u64 {
        match self {
            ShopItem::ReferralBoost => config.referral_boost_cost,
            ShopItem::EternalTorch => config.eternal_torch_cost,
        }
    }

    fn owned_by(self, player: &Player) -> bool {
        match self {
            ShopItem::ReferralBoost => player.referral_boost,
            ShopItem::EternalTorch => player.eternal_torch,
        }
    }
}

impl fmt::Display for ShopItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShopItem::ReferralBoost => write!(f, "referral_boost"),
            ShopItem::EternalTorch => write!(f, "eternal_torch"),
        }
    }
}

impl FromStr for ShopItem {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "referral_boost" => Ok(ShopItem::ReferralBoost),
            "eternal_torch" => Ok(ShopItem::EternalTorch),
            other => Err(EconomyError::InvalidItem(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPurchase {
    pub item: ShopItem,
    pub stars: u64,
    pub flags_updated: bool,
}

/// Buy a permanent item. Owning it already is not an error: nothing is
/// charged and `flags_updated` is false.
pub fn buy_item(player: &mut Player, item: ShopItem, config: &EconomyConfig) -> MinestarsResult<ItemPurchase> {
    if item.owned_by(player) {
        return Ok(ItemPurchase {
            item,
            stars: player.stars,
            flags_updated: false,
        });
    }

    debit_stars(player, item.cost(config))?;
    match item {
        ShopItem::ReferralBoost => player.referral_boost = true,
        ShopItem::EternalTorch => torch::make_eternal(player),
    }
    info!(player_id = player.id, %item, stars = player.stars, "Shop item purchased");

    Ok(ItemPurchase {
        item,
        stars: player.stars,
        flags_updated: true,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCredit {
    pub pickaxes_granted: u64,
    pub extended_secs: i64,
}

/// Credit `count` confirmed referrals: pickaxes, the referral counter and a
/// torch extension scaled by the referral boost.
pub fn credit_referral(player: &mut Player, count: u64, config: &EconomyConfig) -> ReferralCredit {
    if count == 0 {
        return ReferralCredit {
            pickaxes_granted: 0,
            extended_secs: 0,
        };
    }

    let percent = if player.referral_boost {
        config.referral_boost_percent
    } else {
        100
    };
    let base = i128::from(config.referral_extension_secs) * i128::from(count);
    let requested_secs = i64::try_from(base * i128::from(percent) / 100).unwrap_or(i64::MAX);
    let pickaxes_granted = config.referral_stone_pickaxes.saturating_mul(count);

    player.stone_pickaxes = player.stone_pickaxes.saturating_add(pickaxes_granted);
    player.referral_count = player.referral_count.saturating_add(count);
    let extended_secs = torch::extend(player, requested_secs);
    debug!(player_id = player.id, count, extended_secs, "Referrals credited");

    ReferralCredit {
        pickaxes_granted,
        extended_secs,
    }
}

/// Credit stars bought through the payment provider
pub fn credit_purchased_stars(player: &mut Player, amount: u64) -> MinestarsResult<u64> {
    if amount == 0 {
        return Err(EconomyError::AmountTooSmall { amount });
    }
    player.stars = player.stars.saturating_add(amount);
    Ok(player.stars)
}

fn debit_stars(player: &mut Player, cost: u64) -> MinestarsResult<()> {
    if player.stars < cost {
        return Err(EconomyError::InsufficientStars {
            needed: cost,
            available: player.stars,
        });
    }
    player.stars -= cost;
    Ok(())
}
