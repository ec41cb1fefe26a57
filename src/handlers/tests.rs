//! Handler command tests
//!
//! Validation runs before any database access, so these need no connection.
//! Database-backed handler behavior is covered in tests/.

#[cfg(test)]
mod tests {
    use crate::domain::{DomainError, TransactionKind};
    use crate::error::AppError;
    use crate::handlers::{CreateUserCommand, MutationCommand, UpdateUserCommand, UserDetails, UserRecord};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    // =========================================================================
    // Mutation commands
    // =========================================================================

    #[test]
    fn test_mutation_command_parses_kind_and_amount() {
        let user_id = Uuid::new_v4();
        let cmd = MutationCommand::new(user_id, "Credit", "100.50");

        let (kind, amount) = cmd.validate().unwrap();
        assert_eq!(kind, TransactionKind::Credit);
        assert_eq!(amount.value(), dec!(100.5));
    }

    #[test]
    fn test_mutation_command_shortcuts() {
        let user_id = Uuid::new_v4();
        assert_eq!(MutationCommand::credit(user_id, "1").kind, "credit");
        assert_eq!(MutationCommand::debit(user_id, "1").kind, "debit");
    }

    #[test]
    fn test_mutation_command_rejects_unknown_kind() {
        let cmd = MutationCommand::new(Uuid::new_v4(), "refund", "10");
        assert!(matches!(cmd.validate(), Err(DomainError::InvalidKind(_))));
    }

    #[test]
    fn test_mutation_command_rejects_bad_amounts() {
        for amount in ["0", "-5", "abc", "", "0.000000001"] {
            let cmd = MutationCommand::debit(Uuid::new_v4(), amount);
            assert!(
                matches!(cmd.validate(), Err(DomainError::InvalidAmount(_))),
                "amount {amount:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_kind_is_reported_before_amount() {
        let cmd = MutationCommand::new(Uuid::new_v4(), "transfer", "-1");
        assert!(matches!(cmd.validate(), Err(DomainError::InvalidKind(_))));
    }

    #[test]
    fn test_validation_error_maps_to_app_error() {
        let err = MutationCommand::credit(Uuid::new_v4(), "0").validate().unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Domain(DomainError::InvalidAmount(_))));
    }

    // =========================================================================
    // User commands
    // =========================================================================

    #[test]
    fn test_create_user_command_validation() {
        let cmd = CreateUserCommand::new("alice", "Alice", "Smith", "alice@example.com");
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_create_user_command_rejects_bad_fields() {
        let bad = [
            CreateUserCommand::new("al", "Alice", "Smith", "alice@example.com"),
            CreateUserCommand::new("alice", "Al1ce", "Smith", "alice@example.com"),
            CreateUserCommand::new("alice", "Alice", " Smith", "alice@example.com"),
            CreateUserCommand::new("alice", "Alice", "Smith", "alice.example.com"),
        ];

        for cmd in bad {
            assert!(
                matches!(cmd.validate(), Err(DomainError::InvalidField { .. })),
                "{cmd:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_update_user_command_reuses_field_rules() {
        let user_id = Uuid::new_v4();
        let cmd = UpdateUserCommand::new(
            user_id,
            CreateUserCommand::new("bob", "Bob", "Jones", "bob@example"),
        );

        assert_eq!(cmd.user_id, user_id);
        match cmd.validate().unwrap_err() {
            DomainError::InvalidField { field, .. } => assert_eq!(field, "Email"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_user_details_serialize_flat() {
        let now = Utc::now();
        let details = UserDetails {
            user: UserRecord {
                id: Uuid::nil(),
                username: "alice".into(),
                fname: "Alice".into(),
                lname: "Smith".into(),
                email: "alice@example.com".into(),
                created_at: now,
                updated_at: now,
            },
            balance: dec!(12.5),
            total_transactions: 3,
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["total_transactions"], 3);
        assert!(json.get("user").is_none());
    }
}
