//! End-to-end behaviour of the owner task, driven through `ZooHandle` on a
//! paused tokio clock.

use std::time::Duration;

use tokio::time::Instant;

use crazyzoo_core::{AnimalId, DomainError};
use crazyzoo_events::Subscription;
use crazyzoo_infra::{JsonLogBook, SqliteAnimalRepository, XmlLogBook};
use crazyzoo_zoo::{Animal, MORNING_MESSAGE, Phase, ZooEvent};

use crate::{EventContext, Narration, RuntimeConfig, RuntimeError, ZooHandle, ZooRuntime};

fn spawn() -> ZooHandle {
    ZooRuntime::spawn(Box::new(XmlLogBook::new()), RuntimeConfig::default().with_seed(7))
}

async fn next_line(feed: &mut Subscription<Narration>) -> Narration {
    match feed.recv_timeout(Duration::from_secs(3600)).await {
        Some(narration) => narration,
        None => panic!("no narration within an hour"),
    }
}

/// Lines up to and including the first one matching `last`.
async fn lines_until(feed: &mut Subscription<Narration>, last: impl Fn(&str) -> bool) -> Vec<Narration> {
    let mut out = Vec::new();
    loop {
        let narration = next_line(feed).await;
        let done = last(&narration.line);
        out.push(narration);
        if done {
            return out;
        }
    }
}

fn text(lines: &[Narration]) -> Vec<&str> {
    lines.iter().map(|n| n.line.as_str()).collect()
}

fn is_tick(line: &str) -> bool {
    line.starts_with("🌙 Day ") || line == MORNING_MESSAGE
}

async fn house(zoo: &ZooHandle, animal: Animal, enclosure: &str) -> AnimalId {
    let id = zoo.register_animal(animal).await.unwrap();
    assert!(zoo.admit(id, enclosure).await.unwrap());
    id
}

#[tokio::test(start_paused = true)]
async fn feeding_walks_the_roster_with_eating_delays() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    house(&zoo, Animal::dog("Ace", 3, "Pug").unwrap().with_eating_speed(1.0).unwrap(), "A").await;
    house(&zoo, Animal::cat("Bea", 4, "fish").unwrap().with_eating_speed(2.0).unwrap(), "A").await;

    let mut feed = zoo.narrations();
    let start = Instant::now();
    zoo.drop_food("A", "fish").await.unwrap();
    let lines = lines_until(&mut feed, |l| l.starts_with("🎉")).await;

    assert_eq!(
        text(&lines),
        [
            "🍖 fish dropped to enclosure 'A'",
            "  🍽️ Ace happily jumps on the fish!",
            "  ✅ Ace finished eating",
            "  🍽️ Bea cautiously sniffs the fish...",
            "  ✅ Bea finished eating",
            "🎉 All animals in enclosure 'A' are fed!",
        ]
    );
    let elapsed = |i: usize| lines[i].at.duration_since(start);
    assert!(elapsed(1) < Duration::from_millis(1));
    assert!(elapsed(2) >= Duration::from_secs(1));
    assert!(elapsed(4) >= Duration::from_secs(3));
    assert!(elapsed(5) >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn food_subscribers_cannot_change_who_gets_fed() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    house(&zoo, Animal::dog("Ace", 3, "Pug").unwrap(), "A").await;
    house(&zoo, Animal::cat("Bea", 4, "fish").unwrap(), "A").await;

    zoo.subscribe(ZooEvent::FOOD_DROPPED, |_: &ZooEvent, ctx: &mut EventContext| {
        let seen = ctx.roster().len();
        *ctx = EventContext::new(Vec::new());
        ctx.narrate(format!("keeper counted {seen}"));
    })
    .await
    .unwrap();

    let mut feed = zoo.narrations();
    zoo.drop_food("A", "fish").await.unwrap();
    let lines = lines_until(&mut feed, |l| l.starts_with("🎉")).await;

    let text = text(&lines);
    assert!(text.contains(&"keeper counted 2"));
    assert!(text.contains(&"  ✅ Ace finished eating"));
    assert!(text.contains(&"  ✅ Bea finished eating"));
}

#[tokio::test(start_paused = true)]
async fn empty_enclosure_is_fed_at_once() {
    let zoo = spawn();
    zoo.add_enclosure("Empty", 3).await.unwrap();

    let mut feed = zoo.narrations();
    let start = Instant::now();
    zoo.drop_food("Empty", "corn").await.unwrap();
    let lines = lines_until(&mut feed, |l| l.starts_with("🎉")).await;

    assert_eq!(
        text(&lines),
        [
            "🍖 corn dropped to enclosure 'Empty'",
            "🎉 All animals in enclosure 'Empty' are fed!",
        ]
    );
    assert!(lines[1].at.duration_since(start) < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn drops_on_one_enclosure_queue_while_others_run_alongside() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    zoo.add_enclosure("B", 5).await.unwrap();
    house(&zoo, Animal::dog("Slow", 3, "Pug").unwrap().with_eating_speed(2.0).unwrap(), "A").await;
    house(&zoo, Animal::dog("Quick", 3, "Pug").unwrap().with_eating_speed(1.0).unwrap(), "B").await;

    let mut feed = zoo.narrations();
    let start = Instant::now();
    zoo.drop_food("A", "meat").await.unwrap();
    zoo.drop_food("A", "bones").await.unwrap();
    zoo.drop_food("B", "meat").await.unwrap();

    let mut fed = Vec::new();
    let mut seen = Vec::new();
    while fed.len() < 3 {
        let narration = next_line(&mut feed).await;
        if narration.line.starts_with("🎉") {
            fed.push((narration.line.clone(), narration.at.duration_since(start)));
        }
        seen.push(narration.line);
    }

    assert_eq!(fed[0].0, "🎉 All animals in enclosure 'B' are fed!");
    assert_eq!(fed[0].1, Duration::from_secs(1));
    assert_eq!(fed[1].0, "🎉 All animals in enclosure 'A' are fed!");
    assert_eq!(fed[1].1, Duration::from_secs(2));
    assert_eq!(fed[2].0, "🎉 All animals in enclosure 'A' are fed!");
    assert_eq!(fed[2].1, Duration::from_secs(4));

    let bones = seen.iter().position(|l| l == "  🍽️ Slow happily jumps on the bones!").unwrap();
    let first_done = seen.iter().position(|l| l == "  ✅ Slow finished eating").unwrap();
    assert!(first_done < bones, "second run must wait for the first");
}

#[tokio::test(start_paused = true)]
async fn joined_narrates_reactions_and_then_user_subscribers() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    house(&zoo, Animal::cat("Muri", 3, "cheese").unwrap(), "A").await;

    zoo.subscribe(ZooEvent::JOINED, |event: &ZooEvent, ctx: &mut EventContext| {
        if let ZooEvent::Joined { animal, .. } = event {
            ctx.narrate(format!("first saw {}", animal.name()));
        }
    })
    .await
    .unwrap();
    zoo.subscribe(ZooEvent::JOINED, |_: &ZooEvent, ctx: &mut EventContext| {
        ctx.narrate(format!("second saw {} neighbours", ctx.roster().len()));
    })
    .await
    .unwrap();

    let mut feed = zoo.narrations();
    let rex = zoo.register_animal(Animal::dog("Rex", 5, "Shepherd").unwrap()).await.unwrap();
    assert!(zoo.admit(rex, "A").await.unwrap());
    let lines = lines_until(&mut feed, |l| l.starts_with("second")).await;

    assert_eq!(
        text(&lines),
        [
            "✅ Animal added: Rex",
            "🐾 Rex joined enclosure 'A'",
            "  💬 Muri: Pah, a dog! *whispers*",
            "first saw Rex",
            "second saw 1 neighbours",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn full_enclosure_refuses_quietly() {
    let zoo = spawn();
    zoo.add_enclosure("Tiny", 1).await.unwrap();
    house(&zoo, Animal::monkey("Mango", 6).unwrap(), "Tiny").await;
    let riku = zoo.register_animal(Animal::raccoon("Riku", 4).unwrap()).await.unwrap();

    assert!(!zoo.admit(riku, "Tiny").await.unwrap());

    let snapshot = zoo.snapshot().await.unwrap();
    assert_eq!(snapshot.enclosure("Tiny").unwrap().len(), 1);
    assert_eq!(snapshot.animal(riku).unwrap().enclosure(), None);
}

#[tokio::test(start_paused = true)]
async fn ten_ticks_make_five_days() {
    let zoo = spawn();
    let mut feed = zoo.narrations();
    assert!(zoo.start_cycle().await.unwrap());

    let mut ticks = Vec::new();
    while ticks.len() < 10 {
        let narration = next_line(&mut feed).await;
        if is_tick(&narration.line) {
            ticks.push(narration.line);
        }
    }
    zoo.stop_cycle().await.unwrap();

    for (i, line) in ticks.iter().enumerate() {
        if i % 2 == 0 {
            assert!(line.starts_with(&format!("🌙 Day {}: ", i / 2 + 1)), "{line}");
        } else {
            assert_eq!(line, MORNING_MESSAGE);
        }
    }
    let state = zoo.cycle_state().await.unwrap();
    assert_eq!(state.day_count, 5);
    assert_eq!(state.phase, Phase::Day);
    assert!(!state.running);
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_are_idempotent_and_stop_silences_the_timer() {
    let zoo = spawn();
    assert!(zoo.start_cycle().await.unwrap());
    assert!(!zoo.start_cycle().await.unwrap());
    assert!(zoo.stop_cycle().await.unwrap());
    assert!(!zoo.stop_cycle().await.unwrap());

    let mut feed = zoo.narrations();
    tokio::time::sleep(Duration::from_secs(35)).await;
    let lines: Vec<String> = feed.drain().into_iter().map(|n| n.line).collect();
    assert!(lines.iter().all(|l| !is_tick(l)), "{lines:?}");

    let state = zoo.cycle_state().await.unwrap();
    assert_eq!(state.day_count, 0);
    assert!(!state.running);
}

#[tokio::test(start_paused = true)]
async fn interval_change_applies_after_the_scheduled_tick() {
    let zoo = spawn();
    let mut feed = zoo.narrations();
    let start = Instant::now();
    zoo.start_cycle().await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    zoo.change_interval(Duration::from_secs(2)).await.unwrap();
    assert_eq!(zoo.cycle_state().await.unwrap().interval, Duration::from_secs(2));

    let mut at = Vec::new();
    while at.len() < 3 {
        let narration = next_line(&mut feed).await;
        if is_tick(&narration.line) {
            at.push(narration.at.duration_since(start));
        }
    }
    assert_eq!(
        at,
        [
            Duration::from_secs(10),
            Duration::from_secs(12),
            Duration::from_secs(14)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_rejected() {
    let zoo = spawn();
    let err = zoo.change_interval(Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Domain(DomainError::Validation(_))));
}

#[tokio::test(start_paused = true)]
async fn stopping_the_timer_leaves_feeding_alone() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    house(&zoo, Animal::raccoon("Riku", 4).unwrap(), "A").await;
    zoo.start_cycle().await.unwrap();

    let mut feed = zoo.narrations();
    zoo.drop_food("A", "grapes").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    zoo.stop_cycle().await.unwrap();

    let lines = lines_until(&mut feed, |l| l.starts_with("🎉")).await;
    assert!(text(&lines).contains(&"  ✅ Riku finished eating"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_truncates_feeding_and_closes_the_handle() {
    let zoo = spawn();
    zoo.add_enclosure("A", 5).await.unwrap();
    house(&zoo, Animal::dog("Rex", 5, "Shepherd").unwrap(), "A").await;

    let mut feed = zoo.narrations();
    zoo.drop_food("A", "meat").await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    zoo.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let lines: Vec<String> = feed.drain().into_iter().map(|n| n.line).collect();
    assert!(lines.contains(&"  🍽️ Rex happily jumps on the meat!".to_string()));
    assert!(lines.iter().all(|l| !l.contains("finished eating") && !l.starts_with("🎉")));

    assert!(matches!(zoo.logs().await, Err(RuntimeError::Closed)));
    assert!(matches!(zoo.shutdown().await, Err(RuntimeError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn animal_actions_are_narrated() {
    let zoo = spawn();
    let piip = zoo.register_animal(Animal::bird("Piip", 2, "yellow").unwrap()).await.unwrap();
    let rex = zoo.register_animal(Animal::dog("Rex", 5, "Shepherd").unwrap()).await.unwrap();

    let mut feed = zoo.narrations();
    assert_eq!(zoo.toggle_flight(piip).await.unwrap(), Some(true));
    assert_eq!(zoo.toggle_flight(piip).await.unwrap(), Some(false));
    assert_eq!(zoo.toggle_flight(rex).await.unwrap(), None);
    assert!(zoo.act_erratically(rex).await.unwrap().is_some());
    zoo.make_sound(rex).await.unwrap();

    let lines: Vec<String> = feed.drain().into_iter().map(|n| n.line).collect();
    assert_eq!(lines[0], "✈️ Piip is now flying!");
    assert_eq!(lines[1], "✈️ Piip landed!");
    assert_eq!(lines[2], "❌ Rex can't fly!");
    assert!(lines[3].starts_with("🎪 CRAZY! "));
    assert!(lines[4].starts_with("🔊 Rex said: "));

    let missing = zoo.describe(AnimalId::new(99)).await.unwrap_err();
    assert!(matches!(missing, RuntimeError::Domain(DomainError::NotFound(_))));
}

#[tokio::test(start_paused = true)]
async fn retiring_a_housed_animal_empties_its_place() {
    let zoo = spawn();
    zoo.add_enclosure("A", 2).await.unwrap();
    let rex = house(&zoo, Animal::dog("Rex", 5, "Shepherd").unwrap(), "A").await;

    let mut feed = zoo.narrations();
    let retired = zoo.retire_animal(rex).await.unwrap();
    assert_eq!(retired.name(), "Rex");

    let lines: Vec<String> = feed.drain().into_iter().map(|n| n.line).collect();
    assert_eq!(lines, ["🏠 Rex removed from enclosure A", "🗑️ Animal removed: Rex"]);
    assert!(zoo.snapshot().await.unwrap().enclosure("A").unwrap().is_empty());
    zoo.remove_enclosure("A").await.unwrap();
}

#[tokio::test]
async fn logs_survive_save_clear_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zoo-log.json");
    let zoo = ZooRuntime::spawn(Box::new(JsonLogBook::new()), RuntimeConfig::default());
    zoo.narrate("🎉 Welcome to the Crazy Zoo!").await.unwrap();
    zoo.add_enclosure("A", 3).await.unwrap();

    let before = zoo.logs().await.unwrap();
    zoo.save_logs(&path).await.unwrap();
    zoo.clear_logs().await.unwrap();
    assert_eq!(zoo.logs().await.unwrap().len(), 1);

    zoo.load_logs(&path).await.unwrap();
    let after = zoo.logs().await.unwrap();
    assert_eq!(after[..before.len()], before[..]);
    assert!(after[before.len()].ends_with(&format!("📂 Logs loaded: {}", path.display())));
}

#[tokio::test]
async fn catalog_round_trips_through_the_store() {
    let repo = SqliteAnimalRepository::in_memory().await.unwrap();
    let zoo = spawn();
    zoo.add_enclosure("Enclosure A", 5).await.unwrap();
    house(&zoo, Animal::cat("Muri", 3, "cheese").unwrap(), "Enclosure A").await;
    zoo.register_animal(Animal::dog("Bobik", 3, "Puppy").unwrap()).await.unwrap();
    zoo.save_to(&repo).await.unwrap();

    let other = spawn();
    other.load_from(&repo).await.unwrap();
    assert_eq!(other.snapshot().await.unwrap(), zoo.snapshot().await.unwrap());

    let logs = other.logs().await.unwrap();
    assert!(logs[logs.len() - 2].ends_with("📂 Data loaded from database"));
    assert!(logs[logs.len() - 1].ends_with("✅ Loaded 2 animals and 1 enclosures"));
}
