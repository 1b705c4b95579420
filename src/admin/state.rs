//! The lifecycle state machine: which administrative transitions are legal

use silo_cluster::node::OperationalState;

/// Administrative commands and drain completions driving the lifecycle of a
/// datanode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
	StartDecommission,
	Recommission,
	StartMaintenance,
	CompleteDecommission,
	CompleteMaintenance,
}

impl AdminCommand {
	pub const ALL: [AdminCommand; 5] = [
		AdminCommand::StartDecommission,
		AdminCommand::Recommission,
		AdminCommand::StartMaintenance,
		AdminCommand::CompleteDecommission,
		AdminCommand::CompleteMaintenance,
	];
}

/// What applying a command to a node in a given state does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// Move the node to a new state
	Move(OperationalState),
	/// The command has nothing left to do in this state; report success
	Stay,
	/// The command is illegal in this state
	Reject,
}

use AdminCommand::*;
use OperationalState::*;
use Outcome::*;

/// Transition table indexed by `[state][command]`. Commands are idempotent
/// within their own family: decommissioning an already decommissioning or
/// decommissioned node stays put, as does maintenance on a node already in
/// maintenance. Crossing families requires an explicit recommission first.
#[rustfmt::skip]
const TRANSITIONS: [[Outcome; 5]; 5] = [
	//  StartDecommission         Recommission      StartMaintenance           CompleteDecommission   CompleteMaintenance
	[   Move(Decommissioning),    Stay,             Move(EnteringMaintenance), Reject,                Reject   ], // InService
	[   Stay,                     Move(InService),  Reject,                    Move(Decommissioned),  Reject   ], // Decommissioning
	[   Stay,                     Move(InService),  Reject,                    Reject,                Reject   ], // Decommissioned
	[   Reject,                   Move(InService),  Stay,                      Reject,                Move(InMaintenance) ], // EnteringMaintenance
	[   Reject,                   Move(InService),  Stay,                      Reject,                Reject   ], // InMaintenance
];

fn state_index(state: OperationalState) -> usize {
	match state {
		InService => 0,
		Decommissioning => 1,
		Decommissioned => 2,
		EnteringMaintenance => 3,
		InMaintenance => 4,
	}
}

fn command_index(command: AdminCommand) -> usize {
	match command {
		StartDecommission => 0,
		Recommission => 1,
		StartMaintenance => 2,
		CompleteDecommission => 3,
		CompleteMaintenance => 4,
	}
}

/// Look up what the given command does to a node in the given state
pub fn plan(state: OperationalState, command: AdminCommand) -> Outcome {
	TRANSITIONS[state_index(state)][command_index(command)]
}
