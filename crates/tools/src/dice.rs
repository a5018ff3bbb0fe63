//! roll_dice: tabletop dice in `NdM` notation, with an optional `+K`/`-K`.

use async_trait::async_trait;
use modai_core::error::ToolError;
use modai_core::tool::{Arguments, Tool, ToolResult};
use rand::Rng;
use serde_json::{Value, json};
use std::str::FromStr;

use crate::required_str;

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;
const MAX_MODIFIER: i64 = 10_000;

/// A parsed dice expression such as `3d8+2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl FromStr for DiceSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (count, rest) = s
            .split_once('d')
            .ok_or_else(|| format!("'{s}' is not dice notation (expected NdM, e.g. 2d6)"))?;

        let (sides, modifier) = match rest.find(['+', '-']) {
            Some(at) => {
                let modifier: i64 = rest[at..]
                    .parse()
                    .map_err(|_| format!("bad modifier in '{s}'"))?;
                (&rest[..at], modifier)
            }
            None => (rest, 0),
        };

        let count = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| format!("bad dice count in '{s}'"))?
        };
        let sides: u32 = sides.parse().map_err(|_| format!("bad side count in '{s}'"))?;

        if !(1..=MAX_DICE).contains(&count) {
            return Err(format!("dice count must be between 1 and {MAX_DICE}"));
        }
        if !(2..=MAX_SIDES).contains(&sides) {
            return Err(format!("sides must be between 2 and {MAX_SIDES}"));
        }
        if !(-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
            return Err(format!(
                "modifier must be between -{MAX_MODIFIER} and +{MAX_MODIFIER}"
            ));
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

impl DiceSpec {
    pub fn roll(&self, rng: &mut impl Rng) -> Vec<u32> {
        (0..self.count)
            .map(|_| rng.random_range(1..=self.sides))
            .collect()
    }
}

pub struct DiceTool;

impl DiceTool {
    fn run(&self, arguments: &Arguments) -> Result<Value, ToolError> {
        let notation = required_str(arguments, "dice")?;
        let spec: DiceSpec = notation.parse().map_err(ToolError::InvalidArguments)?;

        let rolls = spec.roll(&mut rand::rng());
        let total = rolls.iter().map(|&r| i64::from(r)).sum::<i64>() + spec.modifier;

        Ok(json!({
            "dice": notation,
            "rolls": rolls,
            "modifier": spec.modifier,
            "total": total,
        }))
    }
}

#[async_trait]
impl Tool for DiceTool {
    fn name(&self) -> &str {
        "roll_dice"
    }

    fn description(&self) -> &str {
        "Roll dice in NdM notation (e.g. 2d6, d20, 3d8+2) and return each roll and the total."
    }

    fn example(&self) -> Value {
        json!({ "dice": "2d6" })
    }

    async fn execute(&self, arguments: &Arguments) -> Result<ToolResult, ToolError> {
        Ok(self.run(arguments).into())
    }
}
