mod id_extractor;
mod local_time;

pub use id_extractor::{group_id_from_link, order_id_from_message, WOLT_DOMAIN};
pub use local_time::{
    format_hh_mm,
    is_quiet_hour,
    is_same_day,
    local_time_of_day,
    parse_timezone,
    slack_date,
    JoinCutoff,
    QUIET_HOURS_END,
    QUIET_HOURS_START,
};
