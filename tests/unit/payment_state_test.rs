// Payment record state machine

use paysettle::core::AppError;
use paysettle::payments::PaymentStatus;

const ALL: [PaymentStatus; 4] = [
    PaymentStatus::Initiated,
    PaymentStatus::Completed,
    PaymentStatus::Failed,
    PaymentStatus::Reversed,
];

#[test]
fn test_allowed_transitions() {
    let allowed = [
        (PaymentStatus::Initiated, PaymentStatus::Completed),
        (PaymentStatus::Initiated, PaymentStatus::Failed),
        (PaymentStatus::Completed, PaymentStatus::Reversed),
    ];

    for from in ALL {
        for to in ALL {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition_to(to),
                expected,
                "{} -> {}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_terminal_states_have_no_exit() {
    for from in [PaymentStatus::Failed, PaymentStatus::Reversed] {
        assert!(from.is_terminal());
        for to in ALL {
            assert!(matches!(
                from.ensure_transition(to),
                Err(AppError::Conflict(_))
            ));
        }
    }
    assert!(!PaymentStatus::Initiated.is_terminal());
    assert!(!PaymentStatus::Completed.is_terminal());
}

#[test]
fn test_status_text_round_trip() {
    for status in ALL {
        let text = status.to_string();
        assert_eq!(text.parse::<PaymentStatus>().unwrap(), status);
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::Value::String(text)
        );
    }
    assert!("pending".parse::<PaymentStatus>().is_err());
}
