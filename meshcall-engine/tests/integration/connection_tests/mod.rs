mod test_candidates_queued_until_remote_description;
mod test_duplicate_offer_answered_once;
mod test_glare_rolls_back_and_answers;
mod test_malformed_signal_is_dropped;
mod test_offer_after_user_joined;
mod test_offer_racing_user_joined;
mod test_subscribe_timeout;
