//! # Group Coordination
//!
//! Group membership, meet planning and invitation acceptance. Every change
//! is a read-modify-write against the document store that presents the
//! revision it read; a stale revision is reported to the user and never
//! retried.
//!
//! [`GroupCoordinator`] does the store work and reports typed outcomes; the
//! handler functions below turn those outcomes into replies.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use super::command::GroupAction;
use super::payload::QuickReplyPayload;
use super::ui_builder::invite_message;
use super::BotContext;
use crate::errors::RelayError;
use crate::records::{Collection, GroupRecord, MeetRecord, PersonRecord};
use crate::services::SmsSender;
use crate::store::{create_record, fetch_record, update_record, DocumentStore, Versioned};

pub const GROUP_USAGE: &str = "Usage: @group [create|join|leave] <group_name>";

/// Name used when the organizer has no person record
pub const UNKNOWN_MEMBER_NAME: &str = "A group member";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipOutcome {
    Joined,
    Left,
    AlreadyMember,
    NotMember,
    NoSuchGroup,
    /// Someone else wrote the group between our read and our write
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetOutcome {
    Invited {
        organizer_name: String,
        members: Vec<String>,
    },
    NoSuchGroup,
    NotMember,
    InvalidThreshold {
        members: usize,
    },
    AlreadyPlanned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// The acceptance brought the party to its threshold
    PartyComplete,
    Recorded {
        accepted: usize,
        threshold: u32,
    },
    AlreadyAccepted {
        accepted: usize,
        threshold: u32,
    },
    /// The threshold was reached by earlier acceptances
    AlreadyFull { threshold: u32 },
    NoSuchMeet,
    Conflict,
}

pub struct GroupCoordinator<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> GroupCoordinator<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub async fn create(&self, group: &str, creator: &str) -> Result<CreateOutcome, RelayError> {
        let record = GroupRecord::new(group, creator);
        match create_record(self.store, Collection::Group, group, &record).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(e) if e.is_conflict() => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    pub async fn join(&self, group: &str, user_id: &str) -> Result<MembershipOutcome, RelayError> {
        let Some(mut record) = fetch_record::<GroupRecord>(self.store, Collection::Group, group).await? else {
            return Ok(MembershipOutcome::NoSuchGroup);
        };
        if !record.value.add_member(user_id) {
            return Ok(MembershipOutcome::AlreadyMember);
        }
        self.write_group(group, &record, MembershipOutcome::Joined).await
    }

    pub async fn leave(&self, group: &str, user_id: &str) -> Result<MembershipOutcome, RelayError> {
        let Some(mut record) = fetch_record::<GroupRecord>(self.store, Collection::Group, group).await? else {
            return Ok(MembershipOutcome::NoSuchGroup);
        };
        if !record.value.remove_member(user_id) {
            return Ok(MembershipOutcome::NotMember);
        }
        self.write_group(group, &record, MembershipOutcome::Left).await
    }

    async fn write_group(
        &self,
        group: &str,
        record: &Versioned<GroupRecord>,
        done: MembershipOutcome,
    ) -> Result<MembershipOutcome, RelayError> {
        match update_record(self.store, Collection::Group, group, record).await {
            Ok(revision) => {
                debug!(group = %group, revision = %revision, "Group updated");
                Ok(done)
            }
            Err(e) if e.is_conflict() => Ok(MembershipOutcome::Conflict),
            Err(e) => Err(e),
        }
    }

    /// Validate and record a meet; the caller sends the invitations
    pub async fn plan_meet(
        &self,
        organizer: &str,
        group: &str,
        event: &str,
        threshold: u32,
    ) -> Result<MeetOutcome, RelayError> {
        let Some(record) = fetch_record::<GroupRecord>(self.store, Collection::Group, group).await? else {
            return Ok(MeetOutcome::NoSuchGroup);
        };
        if !record.value.contains(organizer) {
            return Ok(MeetOutcome::NotMember);
        }
        let members = record.value.members;
        if threshold == 0 || threshold as usize > members.len() {
            return Ok(MeetOutcome::InvalidThreshold {
                members: members.len(),
            });
        }

        let organizer_name = self.display_name(organizer).await;

        let meet = MeetRecord::new(group, event, organizer, threshold);
        match create_record(self.store, Collection::Meet, &meet.id, &meet).await {
            Ok(_) => Ok(MeetOutcome::Invited {
                organizer_name,
                members,
            }),
            Err(e) if e.is_conflict() => Ok(MeetOutcome::AlreadyPlanned),
            Err(e) => Err(e),
        }
    }

    /// Record `user_id` as attending a meet
    pub async fn accept_meet(&self, group: &str, event: &str, user_id: &str) -> Result<AcceptOutcome, RelayError> {
        let key = MeetRecord::key(group, event);
        let Some(mut meet) = fetch_record::<MeetRecord>(self.store, Collection::Meet, &key).await? else {
            return Ok(AcceptOutcome::NoSuchMeet);
        };
        let threshold = meet.value.threshold;
        if meet.value.is_full() {
            return Ok(AcceptOutcome::AlreadyFull { threshold });
        }
        if !meet.value.accept(user_id) {
            return Ok(AcceptOutcome::AlreadyAccepted {
                accepted: meet.value.accepted.len(),
                threshold,
            });
        }

        match update_record(self.store, Collection::Meet, &key, &meet).await {
            Ok(_) => {}
            Err(e) if e.is_conflict() => return Ok(AcceptOutcome::Conflict),
            Err(e) => return Err(e),
        }

        // The meet was below its threshold when read, so only this
        // acceptance can be the one that fills it
        if meet.value.is_full() {
            Ok(AcceptOutcome::PartyComplete)
        } else {
            Ok(AcceptOutcome::Recorded {
                accepted: meet.value.accepted.len(),
                threshold,
            })
        }
    }

    /// Full name from the person collection, or a neutral placeholder
    pub async fn display_name(&self, user_id: &str) -> String {
        match fetch_record::<PersonRecord>(self.store, Collection::Person, user_id).await {
            Ok(Some(person)) => {
                let name = person.value.display_name();
                if name.is_empty() {
                    UNKNOWN_MEMBER_NAME.to_string()
                } else {
                    name
                }
            }
            Ok(None) => UNKNOWN_MEMBER_NAME.to_string(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load person record");
                UNKNOWN_MEMBER_NAME.to_string()
            }
        }
    }
}

pub async fn handle_group_command(ctx: &BotContext, sender: &str, action: &GroupAction, group: &str) -> Result<()> {
    let coordinator = GroupCoordinator::new(ctx.store.as_ref());

    let reply = match action {
        GroupAction::Create => match coordinator.create(group, sender).await {
            Ok(CreateOutcome::Created) => {
                info!(user_id = %sender, group = %group, "Group created");
                format!("Successfully created group {group}")
            }
            Ok(CreateOutcome::AlreadyExists) => format!("Group {group} already exists"),
            Err(e) => {
                error!(user_id = %sender, group = %group, error = %e, "Failed to create group");
                format!("Failed to create group {group}")
            }
        },
        GroupAction::Join => match coordinator.join(group, sender).await {
            Ok(outcome) => membership_reply(&outcome, group),
            Err(e) => {
                error!(user_id = %sender, group = %group, error = %e, "Failed to join group");
                format!("Failed to join group {group}")
            }
        },
        GroupAction::Leave => match coordinator.leave(group, sender).await {
            Ok(outcome) => membership_reply(&outcome, group),
            Err(e) => {
                error!(user_id = %sender, group = %group, error = %e, "Failed to leave group");
                format!("Failed to leave group {group}")
            }
        },
        GroupAction::Unknown(other) => {
            debug!(user_id = %sender, action = %other, "Unknown group action");
            GROUP_USAGE.to_string()
        }
    };

    ctx.send_text(sender, reply).await?;
    Ok(())
}

fn membership_reply(outcome: &MembershipOutcome, group: &str) -> String {
    match outcome {
        MembershipOutcome::Joined => format!("Successfully joined group {group}"),
        MembershipOutcome::Left => format!("You have left group {group}"),
        MembershipOutcome::AlreadyMember => format!("Already in group {group}"),
        MembershipOutcome::NotMember => format!("You are not in group {group}"),
        MembershipOutcome::NoSuchGroup => format!("Group {group} does not exist"),
        MembershipOutcome::Conflict => format!("Failed to update group: {group}. Please try again."),
    }
}

/// `@meet <group> <event> <threshold>`: invite every member of the group
pub async fn plan_meet(ctx: &BotContext, organizer: &str, group: &str, event: &str, threshold: u32) -> Result<()> {
    let coordinator = GroupCoordinator::new(ctx.store.as_ref());

    let (organizer_name, members) = match coordinator.plan_meet(organizer, group, event, threshold).await {
        Ok(MeetOutcome::Invited {
            organizer_name,
            members,
        }) => (organizer_name, members),
        Ok(MeetOutcome::NoSuchGroup) => {
            ctx.send_text(organizer, format!("Group {group} does not exist")).await?;
            return Ok(());
        }
        Ok(MeetOutcome::NotMember) => {
            info!(user_id = %organizer, group = %group, "Organizer not in group");
            ctx.send_text(organizer, format!("You are not in group {group}")).await?;
            return Ok(());
        }
        Ok(MeetOutcome::InvalidThreshold { members }) => {
            ctx.send_text(organizer, format!("Threshold must be between 1 and {members}"))
                .await?;
            return Ok(());
        }
        Ok(MeetOutcome::AlreadyPlanned) => {
            ctx.send_text(organizer, format!("Meet {event} already exists in group {group}"))
                .await?;
            return Ok(());
        }
        Err(e) => {
            error!(user_id = %organizer, group = %group, error = %e, "Failed to plan meet");
            ctx.send_text(organizer, format!("Failed to plan meet {event}")).await?;
            return Ok(());
        }
    };

    info!(
        user_id = %organizer,
        group = %group,
        event = %event,
        members = members.len(),
        threshold,
        "Sending meet invitations"
    );
    for member in &members {
        debug!(member = %member, "Contacting member");
        let invite = invite_message(&organizer_name, event, member, group);
        // One unreachable member must not stop the others from being invited
        if let Err(e) = ctx.send_message(member, invite).await {
            warn!(member = %member, event = %event, error = %e, "Invitation not delivered");
        }
    }
    Ok(())
}

/// Handle a tap on an invitation quick reply
pub async fn contact_members(ctx: &BotContext, sender: &str, payload: &QuickReplyPayload) -> Result<()> {
    if payload.is_declined() {
        debug!(user_id = %sender, event = %payload.event, "Invitation declined");
        return Ok(());
    }
    if payload.user != sender {
        warn!(
            user_id = %sender,
            payload_user = %payload.user,
            event = %payload.event,
            "Invitation reply from a different user, dropping"
        );
        return Ok(());
    }
    let event = payload.event.as_str();
    let coordinator = GroupCoordinator::new(ctx.store.as_ref());

    let party_complete = match &payload.group {
        // Invitations issued before meets were recorded carry no group
        None => true,
        Some(group) => match coordinator.accept_meet(group, event, &payload.user).await {
            Ok(AcceptOutcome::PartyComplete) => true,
            Ok(AcceptOutcome::Recorded { accepted, threshold })
            | Ok(AcceptOutcome::AlreadyAccepted { accepted, threshold }) => {
                ctx.send_text(sender, format!("Accepted invitation to {event} ({accepted}/{threshold})"))
                    .await?;
                false
            }
            Ok(AcceptOutcome::AlreadyFull { threshold }) => {
                ctx.send_text(sender, format!("The party for {event} is already full ({threshold}/{threshold})"))
                    .await?;
                false
            }
            Ok(AcceptOutcome::NoSuchMeet) => {
                ctx.send_text(sender, format!("Meet {event} does not exist in group {group}"))
                    .await?;
                false
            }
            Ok(AcceptOutcome::Conflict) => {
                ctx.send_text(sender, format!("Failed to update meet: {event}. Please try again."))
                    .await?;
                false
            }
            Err(e) => {
                error!(user_id = %sender, event = %event, error = %e, "Failed to record acceptance");
                ctx.send_text(sender, format!("Failed to accept invitation to {event}"))
                    .await?;
                false
            }
        },
    };
    if !party_complete {
        return Ok(());
    }

    let name = coordinator.display_name(&payload.user).await;
    let body = format!("{name} has accepted invitation to {event}. Your party is now full!");
    // Alerts go out in the background; the confirmation does not wait on them
    fan_out_sms(ctx.sms.clone(), ctx.config.sms.recipients.clone(), body, event.to_string());

    ctx.send_text(sender, format!("Party complete. Alert messages sent to group event {event}"))
        .await?;
    Ok(())
}

/// Send `body` to every recipient concurrently, logging each outcome.
/// Resolves to the number of messages accepted by the SMS provider.
pub fn fan_out_sms(
    sms: Arc<dyn SmsSender>,
    recipients: Vec<String>,
    body: String,
    event: String,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        if recipients.is_empty() {
            warn!(event = %event, "No SMS recipients configured");
            return 0;
        }

        let body = Arc::new(body);
        let mut sends = JoinSet::new();
        for number in recipients {
            let sms = sms.clone();
            let body = body.clone();
            sends.spawn(async move {
                let result = sms.send(&number, &body).await;
                (number, result)
            });
        }

        let mut delivered = 0;
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((number, Ok(sid))) => {
                    delivered += 1;
                    info!(to = %number, sid = %sid, event = %event, "Alert message sent");
                }
                Ok((number, Err(e))) => {
                    error!(to = %number, event = %event, error = %e, "Unable to send alert message");
                }
                Err(e) => error!(event = %event, error = %e, "Alert task failed"),
            }
        }
        delivered
    })
}
