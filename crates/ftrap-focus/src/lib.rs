#![forbid(unsafe_code)]

//! Focus traps and accessible modals over the ftrap document model.
//!
//! # Role in ftrap
//! `ftrap-focus` keeps keyboard focus inside a designated subtree (a modal,
//! drawer, or similar overlay) until the subtree is released, and restores
//! focus afterwards.
//!
//! # Primary responsibilities
//! - **[`Trap`]**: the capability every trap variant implements.
//! - **[`FocusTrap`]**: the generic controller (Tab cycling, Escape, focus
//!   escape correction, return focus).
//! - **[`ModalTrap`] / [`DrawerTrap`]**: presentation state around the
//!   generic controller.
//! - **[`TrapRegistry`]**: one trap per container and a LIFO stack of
//!   active traps.
//! - **[`FocusRing`], [`FocusGuard`], [`FocusLock`]**: small independent
//!   focus helpers.
//! - **[`ModalDialog`]**: a ready-made accessible dialog built on
//!   [`ModalTrap`].
//! - **[`Page`]**: the event loop that routes DOM events to all of the above.

pub mod dialog;
pub mod drawer;
pub mod error;
pub mod guard;
pub mod lock;
pub mod modal;
pub mod options;
pub mod page;
pub mod registry;
pub mod ring;
pub mod trap;

use std::fmt;

use ftrap_core::{Document, DomEvent, NodeId, OwnerId};

pub use dialog::{DialogOptions, DialogPhase, ModalDialog};
pub use drawer::{DrawerOptions, DrawerTrap};
pub use error::TrapError;
pub use guard::FocusGuard;
pub use lock::FocusLock;
pub use modal::{ModalOptions, ModalTrap};
pub use options::{TrapCallback, TrapHooks, TrapOptions};
pub use page::{DialogId, GuardId, LockId, Page, RingId};
pub use registry::TrapRegistry;
pub use ring::{FocusRing, FocusRingOptions};
pub use trap::FocusTrap;

/// Lifecycle state of a trap.
///
/// State machine: Inactive → Active ⇄ Paused → Inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapState {
    /// No listeners installed, nothing remembered.
    #[default]
    Inactive,
    /// Listeners installed; focus is confined.
    Active,
    /// Listeners removed, but the focusable snapshot and return target kept.
    Paused,
}

/// What a trap asks its owner to do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use]
pub enum TrapSignal {
    #[default]
    None,
    /// Escape, an outside press, or a backdrop click asked to release the
    /// trap. The owner deactivates it so the stack stays consistent.
    Deactivate,
}

/// The capability shared by every trap variant.
///
/// Implementations own their listeners: `activate`/`resume` install them on
/// the document and `deactivate`/`pause` remove them, synchronously, so a
/// trap is never considered active without its listeners in place.
pub trait Trap: fmt::Debug {
    /// The guarded subtree. Observed, never owned.
    fn container(&self) -> NodeId;

    /// Token under which the trap's listeners are registered.
    fn owner(&self) -> OwnerId;

    fn state(&self) -> TrapState;

    /// Idempotent. Resumes a paused trap.
    fn activate(&mut self, doc: &mut Document);

    /// No-op when inactive.
    fn deactivate(&mut self, doc: &mut Document);

    /// No-op unless active.
    fn pause(&mut self, doc: &mut Document);

    /// No-op unless paused.
    fn resume(&mut self, doc: &mut Document);

    /// Focus the first focusable element. Returns `true` if focus moved.
    fn focus_first(&mut self, doc: &mut Document) -> bool;

    /// Focus the last focusable element. Returns `true` if focus moved.
    fn focus_last(&mut self, doc: &mut Document) -> bool;

    /// Focusable elements as of the last refresh, in document order.
    fn focusable_elements(&self) -> &[NodeId];

    /// Handle an event delivered to one of this trap's listeners.
    fn handle_event(&mut self, doc: &mut Document, event: &mut DomEvent) -> TrapSignal;

    /// Replace the lifecycle callbacks.
    fn set_hooks(&mut self, hooks: TrapHooks);

    #[inline]
    fn is_active(&self) -> bool {
        self.state() == TrapState::Active
    }
}
