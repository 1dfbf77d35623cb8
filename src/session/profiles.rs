//! Ready-made session profiles

use super::config::{
    DeviceRole, DeviceType, MultiNodeMode, RangingMethod, RfFrameConfig, ScheduledMode, StsConfig,
};
use super::lifecycle::Session;
use super::types::{MacAddress, SessionType};
use crate::platform::{error::UwbError, Result};

/// One controller ranging against several controlees
///
/// DS-TWR, multicast, time-scheduled. The controller is the initiator and
/// ranges over SP3 frames with static STS, 25 slots per round every 200 ms,
/// SFD 2 and preamble code 10.
///
/// # Errors
///
/// `CapacityExceeded` if the destination list does not fit in one address
/// parameter.
pub fn one_to_many_controller(
    session_id: u32,
    source: MacAddress,
    destinations: &[MacAddress],
) -> Result<Session> {
    let controlees = u8::try_from(destinations.len()).map_err(|_| UwbError::CapacityExceeded)?;
    let mut session = Session::with_identity(session_id, SessionType::Ranging);

    let ranging = &mut session.ranging_params;
    ranging.device_role(DeviceRole::Initiator)?;
    ranging.device_type(DeviceType::Controller)?;
    ranging.multi_node_mode(MultiNodeMode::Multicast)?;
    ranging.ranging_round_usage(RangingMethod::DsTwr)?;
    ranging.scheduled_mode(ScheduledMode::TimeScheduled)?;
    ranging.device_mac_address(source)?;

    let app = &mut session.app_params;
    app.num_controlees(controlees)?;
    app.destination_mac_addresses(destinations)?;
    app.frame_config(RfFrameConfig::Sp3)?;
    app.slots_per_round(25)?;
    app.ranging_duration(200)?;
    app.sts_config(StsConfig::StaticSts)?;
    app.sfd_id(2)?;
    app.preamble_code_index(10)?;

    Ok(session)
}
