//! Actor capability interface.
//!
//! The engine never assumes a concrete actor shape. Anything that exposes
//! health, a location, a message sink, and a target slot can fight; every
//! optional hook is a trait method with a documented no-op default, so the
//! engine calls them unconditionally instead of probing at runtime.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bitflags::bitflags;

use crate::math::{DamageType, WeaponSpec};
use crate::stats::CombatStats;

/// Stable actor identity, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque room handle. Topology lives outside this subsystem; the engine
/// only compares locations for equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationId(pub u64);

bitflags! {
    /// Closed set of combat-relevant status markers.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        /// Guard raised this round; incoming damage is halved.
        const DEFENDING = 1 << 0;
        /// Cannot act this round.
        const STUNNED = 1 << 1;
    }
}

/// Capability set the engine requires from any combatant.
///
/// Mana and stamina are optional: the defaults describe an actor without
/// those pools, and resource costs against an absent pool always pass.
pub trait CombatActor: Send {
    fn id(&self) -> ActorId;
    fn name(&self) -> &str;

    fn health(&self) -> i32;
    fn set_health(&mut self, value: i32);
    fn max_health(&self) -> i32;

    fn stamina(&self) -> i32 {
        0
    }
    fn set_stamina(&mut self, _value: i32) {}
    fn max_stamina(&self) -> i32 {
        0
    }

    fn mana(&self) -> i32 {
        0
    }
    fn set_mana(&mut self, _value: i32) {}
    fn max_mana(&self) -> i32 {
        0
    }

    fn stats(&self) -> CombatStats;

    fn wielded_weapon(&self) -> Option<WeaponSpec> {
        None
    }

    fn location(&self) -> Option<LocationId>;

    /// Deliver an in-world text line to this actor.
    fn send_message(&mut self, text: &str);

    fn target(&self) -> Option<ActorId>;
    fn set_target(&mut self, target: Option<ActorId>);

    fn in_combat(&self) -> bool;
    fn set_in_combat(&mut self, flag: bool);

    fn statuses(&self) -> StatusFlags;
    fn add_status(&mut self, _flags: StatusFlags) {}
    fn remove_status(&mut self, _flags: StatusFlags) {}

    /// Reward granted to killers. `None` falls back to a level-scaled
    /// default at distribution time.
    fn experience_reward(&self) -> Option<u32> {
        None
    }
    fn grant_experience(&mut self, _amount: u32) {}

    // ------------------------------------------------------------------
    // Lifecycle hooks. All default to no-ops.
    // ------------------------------------------------------------------

    /// Called once when the actor joins a combat session.
    fn on_enter_combat(&mut self) {}

    /// Called once when the actor leaves a combat session for any reason.
    fn on_exit_combat(&mut self) {}

    /// Called at the start of the actor's turn, before actions are gathered.
    fn on_turn(&mut self) {}

    /// Called when damage drops the actor below the low-health threshold.
    fn on_low_health(&mut self) {}

    /// Apply incoming damage and return the amount actually dealt.
    ///
    /// The default subtracts directly from health, halving while
    /// [`StatusFlags::DEFENDING`] is set. Hosts override this to route
    /// through armor, shields, or scripted mitigation.
    fn apply_damage(&mut self, _attacker: ActorId, amount: i32, _kind: DamageType) -> i32 {
        let incoming = if self.statuses().contains(StatusFlags::DEFENDING) {
            amount / 2
        } else {
            amount
        };
        let dealt = incoming.min(self.health().max(0));
        self.set_health(self.health() - incoming);
        dealt
    }

    /// Called when the actor is beaten in combat, before `on_death`.
    fn on_defeated(&mut self, _attacker: ActorId) {}

    /// Called when the actor dies. Corpse and loot generation belong to
    /// this hook, not to the engine.
    fn on_death(&mut self, _attacker: ActorId) {}

    /// Called when another combatant in the same location falls.
    fn on_ally_defeated(&mut self, _fallen: ActorId, _attacker: ActorId) {}
}

/// Cloneable shared handle to a combatant.
///
/// Sessions borrow actors for their lifetime; the handle hides the locking
/// so engine code reads like plain accessor calls.
#[derive(Clone)]
pub struct ActorHandle {
    inner: Arc<Mutex<dyn CombatActor>>,
}

impl ActorHandle {
    pub fn new<A: CombatActor + 'static>(actor: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(actor)),
        }
    }

    /// Wrap an actor the host already shares elsewhere.
    pub fn from_arc(inner: Arc<Mutex<dyn CombatActor>>) -> Self {
        Self { inner }
    }

    /// Run `f` with exclusive access to the actor.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn CombatActor) -> T) -> T {
        // A poisoned actor is still usable combat state; recover the guard.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard)
    }

    pub fn id(&self) -> ActorId {
        self.with(|a| a.id())
    }

    pub fn name(&self) -> String {
        self.with(|a| a.name().to_owned())
    }

    pub fn health(&self) -> i32 {
        self.with(|a| a.health())
    }

    pub fn max_health(&self) -> i32 {
        self.with(|a| a.max_health())
    }

    pub fn alive(&self) -> bool {
        self.health() > 0
    }

    pub fn stats(&self) -> CombatStats {
        self.with(|a| a.stats())
    }

    pub fn location(&self) -> Option<LocationId> {
        self.with(|a| a.location())
    }

    pub fn target(&self) -> Option<ActorId> {
        self.with(|a| a.target())
    }

    pub fn set_target(&self, target: Option<ActorId>) {
        self.with(|a| a.set_target(target));
    }

    pub fn statuses(&self) -> StatusFlags {
        self.with(|a| a.statuses())
    }

    pub fn send(&self, text: &str) {
        self.with(|a| a.send_message(text));
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for ActorHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ActorHandle {}

// ============================================================================
// BasicActor
// ============================================================================

/// Straightforward in-memory combatant.
///
/// Suitable for simple NPCs and for tests: messages are buffered, hook
/// invocations are recorded by name, and experience accumulates in a field.
#[derive(Debug)]
pub struct BasicActor {
    id: ActorId,
    name: String,
    health: i32,
    max_health: i32,
    stamina: i32,
    max_stamina: i32,
    mana: i32,
    max_mana: i32,
    stats: CombatStats,
    weapon: Option<WeaponSpec>,
    location: Option<LocationId>,
    target: Option<ActorId>,
    in_combat: bool,
    statuses: StatusFlags,
    reward: Option<u32>,
    experience: u32,
    messages: Vec<String>,
    hook_calls: Vec<&'static str>,
}

impl BasicActor {
    pub fn builder(id: u64, name: impl Into<String>) -> BasicActorBuilder {
        BasicActorBuilder {
            actor: BasicActor {
                id: ActorId(id),
                name: name.into(),
                health: 10,
                max_health: 10,
                stamina: 0,
                max_stamina: 0,
                mana: 0,
                max_mana: 0,
                stats: CombatStats::default(),
                weapon: None,
                location: None,
                target: None,
                in_combat: false,
                statuses: StatusFlags::empty(),
                reward: None,
                experience: 0,
                messages: Vec::new(),
                hook_calls: Vec::new(),
            },
        }
    }

    /// Buffered message lines, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Names of every hook invoked so far, in call order.
    pub fn hook_calls(&self) -> &[&'static str] {
        &self.hook_calls
    }

    pub fn experience(&self) -> u32 {
        self.experience
    }
}

/// Builder for [`BasicActor`].
pub struct BasicActorBuilder {
    actor: BasicActor,
}

impl BasicActorBuilder {
    pub fn health(mut self, value: i32) -> Self {
        self.actor.health = value;
        self.actor.max_health = value;
        self
    }

    pub fn stamina(mut self, value: i32) -> Self {
        self.actor.stamina = value;
        self.actor.max_stamina = value;
        self
    }

    pub fn mana(mut self, value: i32) -> Self {
        self.actor.mana = value;
        self.actor.max_mana = value;
        self
    }

    pub fn stats(mut self, stats: CombatStats) -> Self {
        self.actor.stats = stats;
        self
    }

    pub fn weapon(mut self, weapon: WeaponSpec) -> Self {
        self.actor.weapon = Some(weapon);
        self
    }

    pub fn location(mut self, location: LocationId) -> Self {
        self.actor.location = Some(location);
        self
    }

    pub fn target(mut self, target: ActorId) -> Self {
        self.actor.target = Some(target);
        self
    }

    pub fn experience_reward(mut self, reward: u32) -> Self {
        self.actor.reward = Some(reward);
        self
    }

    pub fn build(self) -> BasicActor {
        self.actor
    }

    /// Build and wrap in a fresh [`ActorHandle`].
    pub fn into_handle(self) -> ActorHandle {
        ActorHandle::new(self.build())
    }
}

impl CombatActor for BasicActor {
    fn id(&self) -> ActorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn health(&self) -> i32 {
        self.health
    }

    fn set_health(&mut self, value: i32) {
        self.health = value.min(self.max_health);
    }

    fn max_health(&self) -> i32 {
        self.max_health
    }

    fn stamina(&self) -> i32 {
        self.stamina
    }

    fn set_stamina(&mut self, value: i32) {
        self.stamina = value.clamp(0, self.max_stamina);
    }

    fn max_stamina(&self) -> i32 {
        self.max_stamina
    }

    fn mana(&self) -> i32 {
        self.mana
    }

    fn set_mana(&mut self, value: i32) {
        self.mana = value.clamp(0, self.max_mana);
    }

    fn max_mana(&self) -> i32 {
        self.max_mana
    }

    fn stats(&self) -> CombatStats {
        self.stats
    }

    fn wielded_weapon(&self) -> Option<WeaponSpec> {
        self.weapon.clone()
    }

    fn location(&self) -> Option<LocationId> {
        self.location
    }

    fn send_message(&mut self, text: &str) {
        self.messages.push(text.to_owned());
    }

    fn target(&self) -> Option<ActorId> {
        self.target
    }

    fn set_target(&mut self, target: Option<ActorId>) {
        self.target = target;
    }

    fn in_combat(&self) -> bool {
        self.in_combat
    }

    fn set_in_combat(&mut self, flag: bool) {
        self.in_combat = flag;
    }

    fn statuses(&self) -> StatusFlags {
        self.statuses
    }

    fn add_status(&mut self, flags: StatusFlags) {
        self.statuses.insert(flags);
    }

    fn remove_status(&mut self, flags: StatusFlags) {
        self.statuses.remove(flags);
    }

    fn experience_reward(&self) -> Option<u32> {
        self.reward
    }

    fn grant_experience(&mut self, amount: u32) {
        self.experience += amount;
    }

    fn on_enter_combat(&mut self) {
        self.hook_calls.push("on_enter_combat");
    }

    fn on_exit_combat(&mut self) {
        self.hook_calls.push("on_exit_combat");
    }

    fn on_turn(&mut self) {
        self.hook_calls.push("on_turn");
    }

    fn on_low_health(&mut self) {
        self.hook_calls.push("on_low_health");
    }

    fn on_defeated(&mut self, _attacker: ActorId) {
        self.hook_calls.push("on_defeated");
    }

    fn on_death(&mut self, _attacker: ActorId) {
        self.hook_calls.push("on_death");
    }

    fn on_ally_defeated(&mut self, _fallen: ActorId, _attacker: ActorId) {
        self.hook_calls.push("on_ally_defeated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_apply_damage_subtracts_health() {
        let mut actor = BasicActor::builder(1, "goblin").health(20).build();
        let dealt = actor.apply_damage(ActorId(2), 6, DamageType::Physical);
        assert_eq!(dealt, 6);
        assert_eq!(actor.health(), 14);
    }

    #[test]
    fn defending_halves_incoming_damage() {
        let mut actor = BasicActor::builder(1, "goblin").health(20).build();
        actor.add_status(StatusFlags::DEFENDING);
        let dealt = actor.apply_damage(ActorId(2), 6, DamageType::Physical);
        assert_eq!(dealt, 3);
        assert_eq!(actor.health(), 17);
    }

    #[test]
    fn overkill_reports_only_remaining_health() {
        let mut actor = BasicActor::builder(1, "goblin").health(4).build();
        let dealt = actor.apply_damage(ActorId(2), 50, DamageType::Physical);
        assert_eq!(dealt, 4);
        assert!(actor.health() <= 0);
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = BasicActor::builder(7, "a").into_handle();
        let b = a.clone();
        let c = BasicActor::builder(8, "a").into_handle();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
