use core::str::FromStr;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crazyzoo_core::{AnimalId, DomainError, DomainResult, Entity};

const NAME_LEN: core::ops::RangeInclusive<usize> = 2..=50;
const EXTRA_LEN: core::ops::RangeInclusive<usize> = 2..=100;
const MAX_AGE: u8 = 100;
/// Longest meal, in seconds.
pub const MAX_EATING_SPEED: f64 = 3600.0;

const KITCHEN_LOOT: [&str; 5] = ["cheese", "a sausage", "fish", "milk", "a chicken fillet"];
const SHINY_TRINKETS: [&str; 6] = [
    "a sparkling gadget",
    "a shiny button",
    "a golden coin",
    "a mirror",
    "a silver spoon",
    "a crystal glass",
];

/// Closed set of animal kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimalKind {
    Cat,
    Dog,
    Bird,
    Raccoon,
    Monkey,
}

/// Optional behaviours, queryable without invoking them.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub erratic_action: bool,
    pub flight: bool,
}

impl AnimalKind {
    pub const ALL: [AnimalKind; 5] = [
        AnimalKind::Cat,
        AnimalKind::Dog,
        AnimalKind::Bird,
        AnimalKind::Raccoon,
        AnimalKind::Monkey,
    ];

    /// Stable tag used by storage.
    pub fn as_str(self) -> &'static str {
        match self {
            AnimalKind::Cat => "Cat",
            AnimalKind::Dog => "Dog",
            AnimalKind::Bird => "Bird",
            AnimalKind::Raccoon => "Raccoon",
            AnimalKind::Monkey => "Monkey",
        }
    }

    /// Seconds an animal of this kind spends eating unless told otherwise.
    pub fn default_eating_speed(self) -> f64 {
        match self {
            AnimalKind::Cat => 1.5,
            AnimalKind::Dog => 1.0,
            AnimalKind::Bird => 0.5,
            AnimalKind::Raccoon => 2.5,
            AnimalKind::Monkey => 1.2,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        Capabilities {
            erratic_action: true,
            flight: matches!(self, AnimalKind::Bird),
        }
    }

    /// Label of the kind-specific extra attribute, if the kind has one.
    pub fn extra_label(self) -> Option<&'static str> {
        match self {
            AnimalKind::Cat => Some("favourite food"),
            AnimalKind::Dog => Some("breed"),
            AnimalKind::Bird => Some("colour"),
            AnimalKind::Raccoon | AnimalKind::Monkey => None,
        }
    }
}

impl core::fmt::Display for AnimalKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimalKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnimalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::unknown_kind(s))
    }
}

/// Kind-specific state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Traits {
    Cat { favorite_food: String },
    Dog { breed: String },
    Bird { color: String, flying: bool },
    Raccoon { things_stolen: u32 },
    Monkey { mischievous: bool },
}

impl Traits {
    fn for_kind(kind: AnimalKind, extra: Option<String>) -> DomainResult<Self> {
        let extra = extra.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        if let Some(text) = &extra {
            if kind.extra_label().is_none() {
                return Err(DomainError::validation(format!(
                    "{kind} has no extra attribute"
                )));
            }
            validate_extra(text)?;
        }

        Ok(match kind {
            AnimalKind::Cat => Traits::Cat {
                favorite_food: extra.unwrap_or_else(|| "fish".to_string()),
            },
            AnimalKind::Dog => Traits::Dog {
                breed: extra.unwrap_or_else(|| "Mixed breed".to_string()),
            },
            AnimalKind::Bird => Traits::Bird {
                color: extra.unwrap_or_else(|| "blue".to_string()),
                flying: false,
            },
            AnimalKind::Raccoon => Traits::Raccoon { things_stolen: 0 },
            AnimalKind::Monkey => Traits::Monkey { mischievous: true },
        })
    }

    pub fn kind(&self) -> AnimalKind {
        match self {
            Traits::Cat { .. } => AnimalKind::Cat,
            Traits::Dog { .. } => AnimalKind::Dog,
            Traits::Bird { .. } => AnimalKind::Bird,
            Traits::Raccoon { .. } => AnimalKind::Raccoon,
            Traits::Monkey { .. } => AnimalKind::Monkey,
        }
    }
}

/// A zoo animal.
///
/// Identity, name and age are shared by every kind; sound, reactions and the
/// optional capabilities are dispatched on `Traits`. The enclosure
/// back-reference is a name only and is maintained by `Enclosure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    id: AnimalId,
    name: String,
    age: u8,
    eating_speed: f64,
    enclosure: Option<String>,
    traits: Traits,
}

/// Flat shape of an animal as stored by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub id: AnimalId,
    pub name: String,
    pub age: i64,
    pub kind: String,
    pub extra_info: Option<String>,
    pub eating_speed: f64,
    pub enclosure: Option<String>,
}

impl Animal {
    /// Create an unsaved animal. `extra` is the favourite food / breed / colour
    /// for the kinds that have one; `None` picks the kind's default.
    pub fn new(
        kind: AnimalKind,
        name: impl Into<String>,
        age: u8,
        extra: Option<String>,
    ) -> DomainResult<Self> {
        let name = validate_name(name.into())?;
        if age > MAX_AGE {
            return Err(DomainError::validation(format!(
                "age must be between 0 and {MAX_AGE}"
            )));
        }

        Ok(Self {
            id: AnimalId::UNSAVED,
            name,
            age,
            eating_speed: kind.default_eating_speed(),
            enclosure: None,
            traits: Traits::for_kind(kind, extra)?,
        })
    }

    pub fn cat(name: impl Into<String>, age: u8, favorite_food: impl Into<String>) -> DomainResult<Self> {
        Self::new(AnimalKind::Cat, name, age, Some(favorite_food.into()))
    }

    pub fn dog(name: impl Into<String>, age: u8, breed: impl Into<String>) -> DomainResult<Self> {
        Self::new(AnimalKind::Dog, name, age, Some(breed.into()))
    }

    pub fn bird(name: impl Into<String>, age: u8, color: impl Into<String>) -> DomainResult<Self> {
        Self::new(AnimalKind::Bird, name, age, Some(color.into()))
    }

    pub fn raccoon(name: impl Into<String>, age: u8) -> DomainResult<Self> {
        Self::new(AnimalKind::Raccoon, name, age, None)
    }

    pub fn monkey(name: impl Into<String>, age: u8) -> DomainResult<Self> {
        Self::new(AnimalKind::Monkey, name, age, None)
    }

    /// Override the kind's default eating speed (seconds).
    pub fn with_eating_speed(mut self, seconds: f64) -> DomainResult<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(DomainError::validation("eating speed must be a positive number"));
        }
        if seconds > MAX_EATING_SPEED {
            return Err(DomainError::validation(format!(
                "eating speed must not exceed {MAX_EATING_SPEED} seconds"
            )));
        }
        self.eating_speed = seconds;
        Ok(self)
    }

    /// Rebuild an animal from its stored shape.
    ///
    /// An unknown kind tag aborts the reconstruction.
    pub fn from_record(record: AnimalRecord) -> DomainResult<Self> {
        let kind: AnimalKind = record.kind.parse()?;
        let age = u8::try_from(record.age)
            .map_err(|_| DomainError::validation(format!("age out of range: {}", record.age)))?;
        let extra = if kind.extra_label().is_some() {
            record.extra_info
        } else {
            None
        };

        let mut animal = Self::new(kind, record.name, age, extra)?.with_eating_speed(record.eating_speed)?;
        animal.id = record.id;
        animal.enclosure = record.enclosure;
        Ok(animal)
    }

    pub fn to_record(&self) -> AnimalRecord {
        AnimalRecord {
            id: self.id,
            name: self.name.clone(),
            age: i64::from(self.age),
            kind: self.kind().as_str().to_string(),
            extra_info: self.extra_info().map(str::to_string),
            eating_speed: self.eating_speed,
            enclosure: self.enclosure.clone(),
        }
    }

    pub fn id(&self) -> AnimalId {
        self.id
    }

    /// Record the identifier handed out by a store or catalog.
    pub fn assign_id(&mut self, id: AnimalId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn kind(&self) -> AnimalKind {
        self.traits.kind()
    }

    pub fn traits(&self) -> &Traits {
        &self.traits
    }

    pub fn eating_speed(&self) -> f64 {
        self.eating_speed
    }

    pub fn eating_duration(&self) -> Duration {
        // Deserialized animals skip validation; clamp instead of panicking.
        Duration::try_from_secs_f64(self.eating_speed.min(MAX_EATING_SPEED)).unwrap_or(Duration::ZERO)
    }

    /// Name of the enclosure this animal currently lives in.
    pub fn enclosure(&self) -> Option<&str> {
        self.enclosure.as_deref()
    }

    pub(crate) fn set_enclosure(&mut self, enclosure: Option<String>) {
        self.enclosure = enclosure;
    }

    pub fn extra_info(&self) -> Option<&str> {
        match &self.traits {
            Traits::Cat { favorite_food } => Some(favorite_food),
            Traits::Dog { breed } => Some(breed),
            Traits::Bird { color, .. } => Some(color),
            Traits::Raccoon { .. } | Traits::Monkey { .. } => None,
        }
    }

    /// Reword the extra attribute (favourite food / breed / colour).
    pub fn set_extra_info(&mut self, text: impl Into<String>) -> DomainResult<()> {
        let text = text.into().trim().to_string();
        validate_extra(&text)?;
        let kind = self.kind();
        match &mut self.traits {
            Traits::Cat { favorite_food: slot }
            | Traits::Dog { breed: slot }
            | Traits::Bird { color: slot, .. } => {
                *slot = text;
                Ok(())
            }
            Traits::Raccoon { .. } | Traits::Monkey { .. } => Err(DomainError::validation(
                format!("{kind} has no extra attribute"),
            )),
        }
    }

    pub fn sound(&self) -> &'static str {
        match self.traits {
            Traits::Cat { .. } => "Meow! Meow!",
            Traits::Dog { .. } => "Woof! Woof!",
            Traits::Bird { .. } => "Tweet! Tweet!",
            Traits::Raccoon { .. } => "Trrrr! Khhhh!",
            Traits::Monkey { .. } => "Ooh-ooh-ah-ah-ah!",
        }
    }

    pub fn describe(&self) -> String {
        let base = format!("{} is {} years old", self.name, self.age);
        match &self.traits {
            Traits::Cat { favorite_food } => format!("{base} and loves {favorite_food}"),
            Traits::Dog { breed } => format!("{base}, breed: {breed}"),
            Traits::Bird { color, flying } => {
                let status = if *flying { "flying" } else { "perched on a branch" };
                format!("{base}, colour: {color}, currently {status}")
            }
            Traits::Raccoon { things_stolen } => {
                format!("{base}, has stolen {things_stolen} things")
            }
            Traits::Monkey { mischievous } => {
                let mood = if *mischievous { "very mischievous" } else { "calm" };
                format!("{base}, is {mood}")
            }
        }
    }

    pub fn react_to_neighbor(&self, newcomer: &Animal) -> String {
        let name = &self.name;
        match self.traits {
            Traits::Cat { .. } if newcomer.kind() == AnimalKind::Dog => {
                format!("{name}: Pah, a dog! *whispers*")
            }
            Traits::Cat { .. } => format!("{name}: Oh, a new neighbour {}!", newcomer.name),
            Traits::Dog { .. } => format!("{name}: *wags tail* Hello, {}!", newcomer.name),
            Traits::Bird { .. } => format!("{name}: *chirps happily* A new friend!"),
            Traits::Raccoon { .. } => format!("{name}: *checks the new neighbour's pockets*"),
            Traits::Monkey { .. } => format!("{name}: *mimics the new neighbour and pulls faces*"),
        }
    }

    pub fn react_to_food(&self, food: &str) -> String {
        let name = &self.name;
        match self.traits {
            Traits::Cat { .. } => format!("{name} cautiously sniffs the {food}..."),
            Traits::Dog { .. } => format!("{name} happily jumps on the {food}!"),
            Traits::Bird { .. } => format!("{name} quickly pecks at the {food}!"),
            Traits::Raccoon { .. } => format!("{name} washes the {food} in water before eating..."),
            Traits::Monkey { .. } => format!("{name} grabs the {food} and escapes up a tree!"),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    pub fn can_act_erratically(&self) -> bool {
        self.capabilities().erratic_action
    }

    pub fn can_fly(&self) -> bool {
        self.capabilities().flight
    }

    /// Perform the kind's erratic action. `None` when the kind has none.
    pub fn act_erratically<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if !self.can_act_erratically() {
            return None;
        }

        let name = self.name.clone();
        let line = match &mut self.traits {
            Traits::Cat { .. } => {
                let stolen = KITCHEN_LOOT.choose(rng).copied().unwrap_or(KITCHEN_LOOT[0]);
                format!("{name} stole {stolen} from the kitchen!")
            }
            Traits::Dog { .. } => {
                format!("{name} barks like mad: WOOF! WOOF! WOOF! WOOF! WOOF!")
            }
            Traits::Bird { flying, .. } => {
                *flying = !*flying;
                let action = if *flying {
                    "started flying wildly"
                } else {
                    "suddenly dropped to the ground"
                };
                format!("{name} {action} and screeches: CHIRP!!! CHIRP!!! CHIRP!!!")
            }
            Traits::Raccoon { things_stolen } => {
                let item = SHINY_TRINKETS.choose(rng).copied().unwrap_or(SHINY_TRINKETS[0]);
                *things_stolen += 1;
                format!("{name} found {item} and hid it in a secret stash!")
            }
            Traits::Monkey { .. } => {
                format!("{name} jumps around like crazy and throws bananas!")
            }
        };
        Some(line)
    }

    /// Toggle flight; returns the new flying state, `None` when the kind cannot fly.
    pub fn toggle_flight(&mut self) -> Option<bool> {
        match &mut self.traits {
            Traits::Bird { flying, .. } => {
                *flying = !*flying;
                Some(*flying)
            }
            _ => None,
        }
    }

    /// Current flying state, `None` when the kind cannot fly.
    pub fn is_flying(&self) -> Option<bool> {
        match self.traits {
            Traits::Bird { flying, .. } => Some(flying),
            _ => None,
        }
    }
}

impl Entity for Animal {
    type Id = AnimalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl core::fmt::Display for Animal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.name, self.kind())
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let name = name.trim().to_string();
    if !NAME_LEN.contains(&name.chars().count()) {
        return Err(DomainError::validation(format!(
            "name must be {} to {} characters long",
            NAME_LEN.start(),
            NAME_LEN.end()
        )));
    }
    Ok(name)
}

fn validate_extra(text: &str) -> DomainResult<()> {
    if !EXTRA_LEN.contains(&text.chars().count()) {
        return Err(DomainError::validation(format!(
            "extra attribute must be {} to {} characters long",
            EXTRA_LEN.start(),
            EXTRA_LEN.end()
        )));
    }
    Ok(())
}
