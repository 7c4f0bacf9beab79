//! Mining progression and reward resolution
//!
//! Each pickaxe class mines its own lane. A lane holds one block at a time;
//! finishing a block rolls a star reward and an independent collectible drop,
//! then draws the next block immediately.
//!
//! Every draw takes the caller's RNG. The economy hands each operation a
//! freshly seeded generator, so outcomes never correlate across players.

use crate::{
    errors::{EconomyError, MinestarsResult},
    player::{LaneView, MiningLane, Player},
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Pickaxe class, one mining lane each
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Stone,
    Diamond,
}

impl Lane {
    pub const ALL: [Lane; 2] = [Lane::Stone, Lane::Diamond];

    /// Blocks this lane can draw, each equally likely
    pub fn candidates(self) -> [BlockType; 2] {
        match self {
            Lane::Stone => [BlockType::Wood, BlockType::Stone],
            Lane::Diamond => [BlockType::Gold, BlockType::Diamond],
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Stone => write!(f, "stone"),
            Lane::Diamond => write!(f, "diamond"),
        }
    }
}

impl FromStr for Lane {
    type Err = EconomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stone" => Ok(Lane::Stone),
            "diamond" => Ok(Lane::Diamond),
            other => Err(EconomyError::InvalidLane(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Wood,
    Stone,
    Gold,
    Diamond,
}

impl BlockType {
    pub const ALL: [BlockType; 4] = [BlockType::Wood, BlockType::Stone, BlockType::Gold, BlockType::Diamond];

    pub fn table(self) -> &'static BlockTable {
        match self {
            BlockType::Wood => &WOOD,
            BlockType::Stone => &STONE,
            BlockType::Gold => &GOLD,
            BlockType::Diamond => &DIAMOND,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Wood => write!(f, "wood"),
            BlockType::Stone => write!(f, "stone"),
            BlockType::Gold => write!(f, "gold"),
            BlockType::Diamond => write!(f, "diamond"),
        }
    }
}

/// Named rare items that can drop from a finished block
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Collectible {
    #[serde(rename = "Snoop Dogg")]
    SnoopDogg,
    #[serde(rename = "Swag Bag")]
    SwagBag,
    #[serde(rename = "Easter Egg")]
    EasterEgg,
    #[serde(rename = "Snoop Cigar")]
    SnoopCigar,
    #[serde(rename = "Low Rider")]
    LowRider,
}

impl Collectible {
    pub fn name(self) -> &'static str {
        match self {
            Collectible::SnoopDogg => "Snoop Dogg",
            Collectible::SwagBag => "Swag Bag",
            Collectible::EasterEgg => "Easter Egg",
            Collectible::SnoopCigar => "Snoop Cigar",
            Collectible::LowRider => "Low Rider",
        }
    }
}

impl fmt::Display for Collectible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weighted star range; a block's buckets sum to 100
#[derive(Debug, Clone, Copy)]
pub struct StarBucket {
    pub weight: u32,
    pub min: u64,
    pub max: u64,
}

/// Static reward table of one block type
#[derive(Debug)]
pub struct BlockTable {
    pub min_hits: u32,
    pub max_hits: u32,
    pub star_buckets: &'static [StarBucket],
    /// Chance in percent that a finished block drops a collectible
    pub drop_percent: u32,
    pub collectibles: &'static [(Collectible, u32)],
}

const fn bucket(weight: u32, min: u64, max: u64) -> StarBucket {
    StarBucket { weight, min, max }
}

static WOOD: BlockTable = BlockTable {
    min_hits: 3,
    max_hits: 5,
    star_buckets: &[bucket(55, 2, 8), bucket(40, 9, 15), bucket(5, 16, 20)],
    drop_percent: 3,
    collectibles: &[
        (Collectible::SnoopDogg, 50),
        (Collectible::SwagBag, 28),
        (Collectible::EasterEgg, 16),
        (Collectible::SnoopCigar, 5),
        (Collectible::LowRider, 1),
    ],
};

static STONE: BlockTable = BlockTable {
    min_hits: 3,
    max_hits: 5,
    star_buckets: &[bucket(55, 4, 10), bucket(40, 11, 18), bucket(5, 18, 24)],
    drop_percent: 5,
    collectibles: &[
        (Collectible::SnoopDogg, 45),
        (Collectible::SwagBag, 28),
        (Collectible::EasterEgg, 18),
        (Collectible::SnoopCigar, 7),
        (Collectible::LowRider, 2),
    ],
};

static GOLD: BlockTable = BlockTable {
    min_hits: 2,
    max_hits: 3,
    star_buckets: &[bucket(100, 270, 500)],
    drop_percent: 25,
    collectibles: &[
        (Collectible::SnoopDogg, 41),
        (Collectible::SwagBag, 27),
        (Collectible::EasterEgg, 20),
        (Collectible::SnoopCigar, 9),
        (Collectible::LowRider, 3),
    ],
};

static DIAMOND: BlockTable = BlockTable {
    min_hits: 4,
    max_hits: 5,
    star_buckets: &[bucket(100, 475, 950)],
    drop_percent: 35,
    collectibles: &[
        (Collectible::SnoopDogg, 38),
        (Collectible::SwagBag, 25),
        (Collectible::EasterEgg, 22),
        (Collectible::SnoopCigar, 11),
        (Collectible::LowRider, 4),
    ],
};

/// Single weighted draw over `entries`. Returns `None` only for an empty or
/// zero-weight table.
pub fn pick_weighted<'a, T, R, W>(rng: &mut R, entries: &'a [T], weight: W) -> Option<&'a T>
where
    R: Rng + ?Sized,
    W: Fn(&T) -> u32,
{
    let total: u32 = entries.iter().map(&weight).sum();
    if total == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total);
    let mut acc = 0;
    for entry in entries {
        acc += weight(entry);
        if roll < acc {
            return Some(entry);
        }
    }
    entries.last()
}

/// Draw a fresh block for `lane`: uniform block type, then uniform hit count
pub fn draw_block<R: Rng + ?Sized>(lane: Lane, rng: &mut R) -> MiningLane {
    let candidates = lane.candidates();
    let block = candidates[rng.gen_range(0..candidates.len())];
    let table = block.table();

    MiningLane {
        block: Some(block),
        hits_required: rng.gen_range(table.min_hits..=table.max_hits),
        hits_done: 0,
    }
}

pub fn roll_stars<R: Rng + ?Sized>(block: BlockType, rng: &mut R) -> u64 {
    pick_weighted(rng, block.table().star_buckets, |b| b.weight)
        .map(|b| rng.gen_range(b.min..=b.max))
        .unwrap_or(0)
}

pub fn roll_collectible<R: Rng + ?Sized>(block: BlockType, rng: &mut R) -> Option<Collectible> {
    let table = block.table();
    if rng.gen_range(0..100) >= table.drop_percent {
        return None;
    }
    pick_weighted(rng, table.collectibles, |(_, w)| *w).map(|(c, _)| *c)
}

/// Reward produced by finishing a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningReward {
    pub completed: bool,
    pub stars_earned: u64,
    pub collectible: Option<Collectible>,
    pub block_type: BlockType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitOutcome {
    pub lane: Lane,
    pub completed: bool,
    pub reward: Option<MiningReward>,
    /// Lane after the hit; a fresh block when `completed`
    pub state: LaneView,
    pub stone_pickaxes: u64,
    pub diamond_pickaxes: u64,
    pub stars: u64,
    pub stars_earned_mine: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineState {
    pub stone_pickaxes: u64,
    pub diamond_pickaxes: u64,
    pub stars: u64,
    pub stars_earned_mine: u64,
    pub stone: LaneView,
    pub diamond: LaneView,
}

/// Give every lane without an active block a fresh one
pub fn ensure_blocks<R: Rng + ?Sized>(player: &mut Player, rng: &mut R) {
    for lane in Lane::ALL {
        if player.lane(lane).block.is_none() {
            *player.lane_mut(lane) = draw_block(lane, rng);
        }
    }
}

pub fn mine_state<R: Rng + ?Sized>(player: &mut Player, rng: &mut R) -> MineState {
    ensure_blocks(player, rng);
    MineState {
        stone_pickaxes: player.stone_pickaxes,
        diamond_pickaxes: player.diamond_pickaxes,
        stars: player.stars,
        stars_earned_mine: player.stars_earned_mine,
        stone: player.stone_lane.view(),
        diamond: player.diamond_lane.view(),
    }
}

/// Apply one pickaxe hit to `lane`.
///
/// Fails without touching the player when the lane has no charges left.
pub fn hit<R: Rng + ?Sized>(player: &mut Player, lane: Lane, rng: &mut R) -> MinestarsResult<HitOutcome> {
    if player.charges(lane) == 0 {
        return Err(EconomyError::InsufficientCharge { lane: lane.to_string() });
    }

    if player.lane(lane).block.is_none() {
        *player.lane_mut(lane) = draw_block(lane, rng);
    }

    *player.charges_mut(lane) -= 1;
    let (block, finished) = {
        let state = player.lane_mut(lane);
        state.hits_done = (state.hits_done + 1).min(state.hits_required);
        (state.block, state.hits_done >= state.hits_required)
    };

    let reward = match block {
        Some(block) if finished => {
            let stars_earned = roll_stars(block, rng);
            let collectible = roll_collectible(block, rng);

            player.stars = player.stars.saturating_add(stars_earned);
            player.stars_earned_mine = player.stars_earned_mine.saturating_add(stars_earned);
            if let Some(item) = collectible {
                player.add_collectible(item.name());
            }
            *player.lane_mut(lane) = draw_block(lane, rng);

            Some(MiningReward {
                completed: true,
                stars_earned,
                collectible,
                block_type: block,
            })
        }
        _ => None,
    };

    Ok(HitOutcome {
        lane,
        completed: reward.is_some(),
        reward,
        state: player.lane(lane).view(),
        stone_pickaxes: player.stone_pickaxes,
        diamond_pickaxes: player.diamond_pickaxes,
        stars: player.stars,
        stars_earned_mine: player.stars_earned_mine,
    })
}
