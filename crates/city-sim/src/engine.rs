//! Simulation engine.
//!
//! Drives one city through a bounded run of ticks. Within a tick the order is
//! fixed: attention decay, resources, mood, then the periodic narrative and
//! evaluation passes, then progress. The engine holds the city mutably for
//! the whole run and only saves between ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use city_model::{
    ChoicePattern, City, CitySnapshot, DialogueContext, GameState, Mood, RelationshipRules,
    ResourceKind, Speaker, StoryBeat, ThreadCategory,
};
use narrator::{
    default_templates, DialogueLibrary, MomentDeck, MomentOutcome, NarrativeContext,
    NarrativeLine, NarrativeSelector, NarrativeTemplates,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::beats::{FiredBeat, StoryBeatEngine};
use crate::config::SimConfig;
use crate::content::ContentLibrary;
use crate::emergence::{Emergence, EmergenceEvaluator};
use crate::error::InteractionError;
use crate::interaction;
use crate::mood::{derive_mood, MoodInputs};
use crate::services::{Clock, CityNotification, Notifier, SystemClock, TracingNotifier};
use crate::store::{CityStore, MemoryStore, SavedCity, StoreError};

/// Answered requests beyond this many add no further per-tick bonus.
const RESPONSE_BONUS_CAP: u32 = 5;
/// Complexity growth gained per existing thread.
const COMPLEXITY_PER_THREAD: f32 = 0.1;

/// How a call to [`SimulationEngine::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Ran to the tick limit or full progress.
    Completed { ticks: u32, conclusion: String },
    /// Stopped early by the cancel signal; still concluded and saved.
    Cancelled { ticks: u32, conclusion: String },
    /// The city was already running; nothing happened.
    AlreadyRunning,
}

impl RunOutcome {
    pub fn conclusion(&self) -> Option<&str> {
        match self {
            RunOutcome::Completed { conclusion, .. } | RunOutcome::Cancelled { conclusion, .. } => {
                Some(conclusion.as_str())
            }
            RunOutcome::AlreadyRunning => None,
        }
    }

    pub fn ticks(&self) -> u32 {
        match self {
            RunOutcome::Completed { ticks, .. } | RunOutcome::Cancelled { ticks, .. } => *ticks,
            RunOutcome::AlreadyRunning => 0,
        }
    }
}

/// What one evaluation pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub emergences: Vec<Emergence>,
    pub beats: Vec<FiredBeat>,
}

/// Runs cities.
pub struct SimulationEngine {
    config: SimConfig,
    rng: SmallRng,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    store: Box<dyn CityStore + Send>,
    rules: RelationshipRules,
    selector: NarrativeSelector,
    emergence: EmergenceEvaluator,
    beats: StoryBeatEngine,
    dialogue: DialogueLibrary,
    deck: MomentDeck,
    game_state: GameState,
}

impl SimulationEngine {
    /// Engine with the system clock, tracing notifications and an in-memory
    /// store. The random source is seeded from the config.
    pub fn new(config: SimConfig, content: ContentLibrary) -> Self {
        let selector = NarrativeSelector::new(default_templates(), config.narrator.selection.clone());
        let deck = MomentDeck::from_library(&content.moments, config.narrator.moments.clone());
        Self {
            rng: SmallRng::seed_from_u64(config.simulation.seed),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(TracingNotifier),
            store: Box::new(MemoryStore::new()),
            rules: RelationshipRules::standard(),
            selector,
            emergence: EmergenceEvaluator::new(content.rules),
            beats: StoryBeatEngine::new(content.beats),
            dialogue: content.dialogue,
            deck,
            game_state: GameState::new(),
            config,
        }
    }

    pub fn with_store(mut self, store: Box<dyn CityStore + Send>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn with_templates(mut self, templates: NarrativeTemplates) -> Self {
        self.selector = NarrativeSelector::new(templates, self.config.narrator.selection.clone());
        self
    }

    pub fn with_game_state(mut self, game_state: GameState) -> Self {
        self.deck.sync_with(&game_state);
        self.game_state = game_state;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn deck(&self) -> &MomentDeck {
        &self.deck
    }

    /// The story beats as they stand for this city.
    pub fn beats_for(&self, city: &City) -> Vec<StoryBeat> {
        self.beats.beats_for(city)
    }

    pub fn store(&self) -> &dyn CityStore {
        self.store.as_ref()
    }

    pub fn snapshot(&self, city: &City) -> CitySnapshot {
        city.snapshot(self.clock.now())
    }

    /// Counts a player choice toward the session's dominant pattern.
    pub fn record_choice(&mut self, pattern: ChoicePattern) -> u32 {
        let count = self.game_state.record_choice(pattern);
        debug!("Choice {} recorded ({} total)", pattern, count);
        count
    }

    pub fn record_interaction(&self, city: &mut City) {
        interaction::record_interaction(city, self.clock.now(), &self.config.resources);
    }

    pub fn respond_to_request(
        &self,
        city: &mut City,
        request_id: &str,
        text: &str,
    ) -> Result<(), InteractionError> {
        interaction::respond_to_request(
            city,
            request_id,
            text,
            self.clock.now(),
            &self.config.resources,
        )
    }

    /// Recalls a moment: flags it remembered and logs its remembered text.
    pub fn remember_moment(
        &mut self,
        city: &mut City,
        moment_id: &str,
    ) -> Result<String, InteractionError> {
        let text = self
            .deck
            .remember(moment_id, &mut self.game_state)
            .ok_or_else(|| InteractionError::UnknownMoment(moment_id.to_string()))?;
        city.push_log(text.clone());
        Ok(text)
    }

    /// Weaves a new thread into the city, greets it, and evaluates at once.
    pub fn weave_thread(&mut self, city: &mut City, category: ThreadCategory) -> String {
        let now = self.clock.now();
        let city_id = city.id.clone();
        let thread_id = city.threads.weave(category, &city_id, now, &self.rules);

        let greeting = match self.dialogue.line(
            Speaker::from(category),
            DialogueContext::ThreadWoven,
            &mut self.rng,
        ) {
            Some(line) => Some(line),
            None => self
                .dialogue
                .line(Speaker::City, DialogueContext::Greeting, &mut self.rng),
        };
        if let Some(line) = greeting {
            city.push_log(line);
        }
        if let Some(name) = self
            .dialogue
            .alternate_name(Speaker::from(category), &mut self.rng)
        {
            city.push_awareness(format!("Began to hear {}", name));
        }
        info!("Wove {} into {}", thread_id, city.name);

        self.evaluate(city, now);
        thread_id
    }

    /// Loads a saved city and adopts its session state.
    pub fn load_city(&mut self, city_id: &str) -> Result<Option<City>, StoreError> {
        let Some(saved) = self.store.load(city_id)? else {
            return Ok(None);
        };
        let mut city = saved.city;
        if city.is_running {
            // Saved between ticks of a run that never finished.
            warn!("City {} was saved mid-run; clearing its running flag", city.id);
            city.is_running = false;
        }
        self.deck.sync_with(&saved.game_state);
        self.game_state = saved.game_state;
        Ok(Some(city))
    }

    /// Saves the city with the current session state.
    pub fn save(&mut self, city: &City) -> Result<(), StoreError> {
        let saved = SavedCity::new(city, &self.game_state, self.clock.now());
        self.store.save(&saved)
    }

    fn persist(&mut self, city: &City) {
        if let Err(e) = self.save(city) {
            warn!("Failed to save {}: {}", city.id, e);
        }
    }

    fn notify(&self, notification: CityNotification) {
        self.notifier.notify(&notification);
    }

    /// Runs the city until the tick limit, full progress, or cancellation.
    ///
    /// Either way the run ends with exactly one concluding log line and a
    /// save. A city that is already running is left untouched.
    pub async fn run(&mut self, city: &mut City, mut cancel: watch::Receiver<bool>) -> RunOutcome {
        if city.is_running {
            warn!("City {} is already running; ignoring start", city.id);
            return RunOutcome::AlreadyRunning;
        }
        city.is_running = true;

        let sim = self.config.simulation.clone();
        let delay = Duration::from_millis(sim.tick_delay_ms);
        info!(
            "Starting {} for up to {} ticks (seed {})",
            city.name, sim.max_ticks, sim.seed
        );

        let mut ticks = 0;
        let mut cancelled = false;
        for tick in 1..=sim.max_ticks {
            if *cancel.borrow() {
                cancelled = true;
                break;
            }
            if city.progress() >= 1.0 {
                break;
            }

            self.tick(city, tick);
            ticks = tick;

            if sim.save_interval > 0 && tick % sim.save_interval == 0 {
                self.persist(city);
            }
            if city.progress() >= 1.0 || tick == sim.max_ticks {
                break;
            }
            if pause(delay, &mut cancel).await {
                cancelled = true;
                break;
            }
        }

        let conclusion = self.conclude(city);
        city.is_running = false;
        self.persist(city);
        info!("{} stopped after {} ticks", city.name, ticks);

        if cancelled {
            RunOutcome::Cancelled { ticks, conclusion }
        } else {
            RunOutcome::Completed { ticks, conclusion }
        }
    }

    /// One tick of the simulation.
    pub fn tick(&mut self, city: &mut City, tick: u32) {
        let now = self.clock.now();
        self.update_resources(city, now);
        if let Some(mood) = self.update_mood(city, now) {
            if let Some(line) =
                self.dialogue
                    .line(Speaker::City, DialogueContext::from(mood), &mut self.rng)
            {
                city.push_log(line);
            }
        }

        let sim = &self.config.simulation;
        let narrate = sim.narrative_interval > 0 && tick % sim.narrative_interval == 0;
        let evaluate = sim.evaluation_interval > 0 && tick % sim.evaluation_interval == 0;
        let increment = sim.progress_increment;

        if narrate {
            self.narrate(city, now);
        }
        if evaluate {
            self.evaluate(city, now);
        }

        let progress = city.advance_progress(increment);
        city.push_log(format!("Progress: {:.0}%", progress * 100.0));
        debug!(
            "Tick {}: mood {}, coherence {:.3}, trust {:.3}, attention {:.3}",
            tick,
            city.mood,
            city.resources.coherence(),
            city.resources.trust(),
            city.attention_level()
        );
    }

    fn update_resources(&self, city: &mut City, now: DateTime<Utc>) {
        let res = &self.config.resources;
        let abandonment = city.abandonment_hours(now);

        city.adjust_attention(-res.attention_decay * (1.0 + abandonment / 24.0));
        let neglect = 1.0 - city.attention_level();
        let answered = city.responses_given().min(RESPONSE_BONUS_CAP) as f32;
        let response_bonus = res.trust_response_bonus * answered;
        let threads = city.threads.len() as f32;
        let growth_rate = city.growth_rate();

        city.adjust(
            ResourceKind::Coherence,
            -res.coherence_decay * neglect * 2.0 + response_bonus,
        );
        city.adjust(ResourceKind::Memory, res.memory_growth);
        city.adjust(
            ResourceKind::Trust,
            -res.trust_neglect * abandonment + response_bonus,
        );
        city.adjust(
            ResourceKind::Autonomy,
            res.autonomy_growth * (neglect + (abandonment / 24.0).min(2.0)),
        );
        city.adjust(
            ResourceKind::Complexity,
            res.complexity_growth * (1.0 + COMPLEXITY_PER_THREAD * threads) * growth_rate,
        );
    }

    /// Re-derives the mood. Returns the new mood when it changed.
    fn update_mood(&self, city: &mut City, now: DateTime<Utc>) -> Option<Mood> {
        let mood = derive_mood(&MoodInputs::from_city(city, now));
        if mood == city.mood {
            return None;
        }
        self.notify(CityNotification::MoodChanged {
            city_id: city.id.clone(),
            from: city.mood,
            to: mood,
        });
        city.push_awareness(format!("Became {}", mood));
        city.mood = mood;
        Some(mood)
    }

    fn narrate(&mut self, city: &mut City, now: DateTime<Utc>) {
        let ctx = NarrativeContext::from_city(city, now);
        for line in self.selector.evolve(&ctx, &mut self.rng) {
            match line {
                NarrativeLine::Log(text) => city.push_log(text),
                NarrativeLine::Request(text) => {
                    let request_id = city.ask(text.clone(), now);
                    city.push_log(format!("{} asks: {}", city.name, text));
                    self.notify(CityNotification::RequestAsked {
                        city_id: city.id.clone(),
                        request_id,
                        text,
                    });
                }
            }
        }

        let moments = &self.config.narrator.moments;
        let (reveal_chance, resolve_chance) = (moments.reveal_chance, moments.resolve_chance);

        if self.rng.gen::<f32>() < reveal_chance {
            if let Some(id) = self.deck.draw(&self.game_state, &mut self.rng) {
                if let Some(text) = self.deck.reveal(&id, &mut self.game_state, now) {
                    city.push_log(text.clone());
                    self.notify(CityNotification::MomentRevealed {
                        city_id: city.id.clone(),
                        moment_id: id,
                        text,
                    });
                }
            }
        }

        if self.rng.gen::<f32>() < resolve_chance {
            if let Some(id) = self.deck.pending(&mut self.rng) {
                if let Some(outcome) = self.deck.resolve(&id, &mut self.game_state, &mut self.rng) {
                    if matches!(outcome, MomentOutcome::Destroyed(_)) {
                        info!("Moment {} lost in {}", id, city.name);
                    }
                    city.push_log(outcome.text().to_string());
                }
            }
        }
    }

    /// Evaluates emergence rules, then story beats.
    pub fn evaluate(&mut self, city: &mut City, now: DateTime<Utc>) -> Evaluation {
        let emergences = self.emergence.evaluate(city, now);
        let mut beats = Vec::new();

        for emergence in &emergences {
            self.notify(CityNotification::Emergence {
                city_id: city.id.clone(),
                name: emergence.name.clone(),
            });
            if let Some(line) =
                self.dialogue
                    .line(Speaker::City, DialogueContext::Emergence, &mut self.rng)
            {
                city.push_log(line);
            }
            if let Some(beat_id) = &emergence.story_beat_id {
                beats.extend(self.beats.fire_by_id(beat_id, city));
            }
        }
        beats.extend(self.beats.evaluate(city));

        for beat in &beats {
            self.notify(CityNotification::StoryBeat {
                city_id: city.id.clone(),
                beat_id: beat.id.clone(),
                name: beat.name.clone(),
            });
        }
        Evaluation { emergences, beats }
    }

    /// A parting line from the city, for when the player walks away.
    pub fn farewell(&mut self) -> Option<String> {
        self.dialogue
            .line(Speaker::City, DialogueContext::Farewell, &mut self.rng)
    }

    /// Appends the single concluding line for a run and returns it.
    pub fn conclude(&mut self, city: &mut City) -> String {
        let now = self.clock.now();
        self.update_mood(city, now);

        let line = self.selector.conclude(&NarrativeContext::from_city(city, now));
        city.push_log(line.clone());
        self.notify(CityNotification::RunFinished {
            city_id: city.id.clone(),
            conclusion: line.clone(),
        });
        line
    }
}

/// Waits out the tick delay. Returns true if cancellation arrived first.
async fn pause(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return true,
                Ok(()) => continue,
                // Sender gone: nobody can cancel any more.
                Err(_) => {
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ManualClock, RecordingNotifier};
    use city_model::fixtures::{epoch, sample_city};
    use city_model::Mood;

    fn engine() -> SimulationEngine {
        let mut config = SimConfig::default();
        config.simulation.tick_delay_ms = 0;
        let content = ContentLibrary::builtin().unwrap();
        SimulationEngine::new(config, content).with_clock(Arc::new(ManualClock::new(epoch())))
    }

    #[test]
    fn test_tick_decays_and_logs_progress() {
        let mut engine = engine();
        let mut city = sample_city();

        engine.tick(&mut city, 1);

        assert!(city.attention_level() < 0.5);
        assert!(city.resources.coherence() < 1.0);
        assert!(city.resources.memory() > 0.0);
        assert!(city.resources.autonomy() > 0.0);
        assert_eq!(city.log.last().map(String::as_str), Some("Progress: 1%"));
    }

    #[test]
    fn test_mood_change_notifies() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut engine = engine().with_notifier(notifier.clone());
        let mut city = sample_city();
        city.set_progress(0.5);

        engine.tick(&mut city, 1);

        assert_eq!(city.mood, Mood::Waiting);
        assert!(notifier
            .notifications()
            .iter()
            .any(|n| matches!(n, CityNotification::MoodChanged { to: Mood::Waiting, .. })));
        assert_eq!(city.awareness_events, vec!["Became waiting".to_string()]);
        assert!(city.log.contains(&"I keep the lights on for you.".to_string()));
    }

    #[test]
    fn test_farewell_line() {
        let mut engine = engine();
        assert_eq!(engine.farewell().as_deref(), Some("Walk safely. I will be here."));
    }

    #[test]
    fn test_abandonment_speeds_attention_decay() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let mut engine = engine().with_clock(clock.clone());
        let mut present = sample_city();
        let mut absent = sample_city();

        engine.tick(&mut present, 1);
        clock.advance(chrono::Duration::hours(48));
        engine.tick(&mut absent, 1);

        assert!(absent.attention_level() < present.attention_level());
        assert!(absent.resources.trust() < present.resources.trust());
        assert_eq!(absent.mood, Mood::Forgotten);
    }

    #[test]
    fn test_weave_thread_greets_and_evaluates() {
        let mut engine = engine();
        let mut city = sample_city();

        let id = engine.weave_thread(&mut city, ThreadCategory::Water);

        assert_eq!(id, "water-1");
        assert!(city.has_triggered("beat_first_thread"));
        assert!(city
            .log
            .iter()
            .any(|l| l.contains("pipes") || l.contains("patient")));
        assert!(city
            .awareness_events
            .iter()
            .any(|e| e == "Began to hear the reservoir" || e == "Began to hear the mains"));
    }

    #[test]
    fn test_emergence_fires_linked_beat() {
        let mut engine = engine();
        let mut city = sample_city();

        engine.weave_thread(&mut city, ThreadCategory::Water);
        engine.weave_thread(&mut city, ThreadCategory::Sewage);

        assert!(city.has_emergent_property("Circulatory Awareness"));
        assert!(city.has_triggered("beat_circulation"));
        assert!(city.has_triggered("beat_river_meets_drain"));
        assert!(city
            .discovered_perceptions
            .contains(&"pressure in the mains".to_string()));
    }

    #[test]
    fn test_remember_unknown_moment() {
        let mut engine = engine();
        let mut city = sample_city();

        assert_eq!(
            engine.remember_moment(&mut city, "m_nowhere"),
            Err(InteractionError::UnknownMoment("m_nowhere".to_string()))
        );
        let text = engine.remember_moment(&mut city, "m_clock_tower").unwrap();
        assert_eq!(city.log.last(), Some(&text));
        assert!(engine.deck().get("m_clock_tower").unwrap().remembered);
    }

    #[test]
    fn test_load_city_clears_running_flag() {
        let mut engine = engine();
        let mut city = sample_city();
        city.is_running = true;
        engine.record_choice(ChoicePattern::Story);
        engine.save(&city).unwrap();
        assert!(engine.load_city("city_elsewhere").unwrap().is_none());

        let loaded = engine.load_city(&city.id).unwrap().unwrap();
        assert!(!loaded.is_running);
        assert_eq!(engine.game_state().choice_count(ChoicePattern::Story), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let mut engine = engine();
        let mut city = sample_city();
        let (tx, rx) = watch::channel(true);

        let outcome = engine.run(&mut city, rx).await;

        assert_eq!(outcome.ticks(), 0);
        assert!(matches!(outcome, RunOutcome::Cancelled { .. }));
        assert_eq!(city.log, vec![outcome.conclusion().unwrap().to_string()]);
        assert!(!city.is_running);
        drop(tx);
    }

    #[tokio::test]
    async fn test_dropped_sender_still_runs() {
        let mut engine = engine();
        let mut city = sample_city();
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let outcome = engine.run(&mut city, rx).await;

        assert!(matches!(outcome, RunOutcome::Completed { .. }));
        assert!(outcome.ticks() >= 99);
    }
}
