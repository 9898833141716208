mod test_connection_lost_and_recovered;
mod test_leave_then_join_does_not_leak;
mod test_send_failure_is_non_fatal;
mod test_simultaneous_joins_converge;
mod test_user_left_cancels_scheduled_offer;
