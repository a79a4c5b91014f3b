//! Create, read, update and delete through `FormsRepository`.

mod common;

use common::{application, pesticide_request, shrub_request, test_db};
use core_types::{
    ApprovalState, Caller, CommonFieldsPatch, DetailsPatch, FormType, FormUpdate,
    NewPesticideDetails, PesticidePatch, Role, ShrubDetails, ShrubPatch,
};
use database::{DbError, ErrorKind};
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn test_shrub_form_is_visible_only_to_its_owner() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner_a = db.employee().await;
    let owner_b = db.employee().await;

    let form = db
        .repo
        .create_form(&owner_a, shrub_request("Jane", "Doe", 6))
        .await
        .unwrap();
    assert_eq!(form.owner_id, owner_a.user_id);
    assert_eq!(form.form_type, FormType::Shrub);
    assert_eq!(form.created_at, form.updated_at);

    let err = db.repo.get_form_view(&owner_b, form.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFoundOrUnauthorized));

    let view = db.repo.get_form_view(&owner_a, form.id).await.unwrap();
    assert_eq!(view.form_type(), FormType::Shrub);
    assert_eq!(view.shrub(), Some(&ShrubDetails { flea_only: false, num_shrubs: 6 }));
    assert!(view.pesticide().is_none());
    assert_eq!(view.form.common.first_name, "Jane");
    assert_eq!(view.form.common.last_name, "Doe");
}

#[tokio::test]
async fn test_pesticide_form_round_trips_application_lines() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let chemical = db.chemical().await;

    let form = db
        .repo
        .create_form(
            &owner,
            pesticide_request(
                "Sam",
                "Reed",
                vec![application(chemical, "FY"), application(chemical, "BY")],
            ),
        )
        .await
        .unwrap();

    let view = db.repo.get_form_view(&owner, form.id).await.unwrap();
    let details = view.pesticide().expect("pesticide details");
    assert!(view.shrub().is_none());
    assert_eq!(details.lawn_area_sq_ft, 8000);
    assert_eq!(details.applications.len(), 2);
    assert!(details.applications.iter().all(|a| a.chemical_id == chemical));
}

#[tokio::test]
async fn test_contradictory_payloads_leave_no_rows() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let before = db.count_forms(&owner).await;

    let mut both = shrub_request("Jane", "Doe", 1);
    both.pesticide = Some(NewPesticideDetails::default());
    let err = db.repo.create_form(&owner, both).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut neither = shrub_request("Jane", "Doe", 1);
    neither.shrub = None;
    let err = db.repo.create_form(&owner, neither).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(db.count_forms(&owner).await, before);
}

#[tokio::test]
async fn test_failed_detail_insert_rolls_back_base_row() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;

    // No chemical has this id, so the line item insert violates its foreign key
    // after the base and detail rows were written.
    let request = pesticide_request("Ann", "Lee", vec![application(i64::MAX, "FY")]);
    let err = db.repo.create_form(&owner, request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(db.count_forms(&owner).await, 0);
}

#[tokio::test]
async fn test_non_owner_gets_same_error_as_missing_form() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let intruder = db.employee().await;
    let form = db
        .repo
        .create_form(&owner, shrub_request("Jane", "Doe", 2))
        .await
        .unwrap();
    let missing_id = Uuid::new_v4();

    let foreign_read = db.repo.get_form_view(&intruder, form.id).await.unwrap_err();
    let missing_read = db.repo.get_form_view(&intruder, missing_id).await.unwrap_err();
    assert_eq!(foreign_read.kind(), ErrorKind::NotFoundOrUnauthorized);
    assert_eq!(foreign_read.to_string(), missing_read.to_string());

    let rename = FormUpdate {
        common: CommonFieldsPatch { first_name: Some("Mallory".into()), ..Default::default() },
        ..Default::default()
    };
    let foreign_update = db
        .repo
        .update_form(&intruder, form.id, rename.clone())
        .await
        .unwrap_err();
    let missing_update = db.repo.update_form(&intruder, missing_id, rename).await.unwrap_err();
    assert_eq!(foreign_update.kind(), ErrorKind::NotFoundOrUnauthorized);
    assert_eq!(foreign_update.to_string(), missing_update.to_string());

    let foreign_delete = db.repo.delete_form(&intruder, form.id).await.unwrap_err();
    let missing_delete = db.repo.delete_form(&intruder, missing_id).await.unwrap_err();
    assert_eq!(foreign_delete.kind(), ErrorKind::NotFoundOrUnauthorized);
    assert_eq!(foreign_delete.to_string(), missing_delete.to_string());

    // The owner's form is untouched.
    let view = db.repo.get_form_view(&owner, form.id).await.unwrap();
    assert_eq!(view.form.common.first_name, "Jane");
}

#[tokio::test]
async fn test_pending_caller_is_refused() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let pending = Caller::new(owner.user_id, Role::Employee, ApprovalState::Pending);

    let err = db
        .repo
        .create_form(&pending, shrub_request("Jane", "Doe", 1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundOrUnauthorized);
    assert_eq!(db.count_forms(&owner).await, 0);
}

#[tokio::test]
async fn test_update_keeps_discriminator_and_refreshes_timestamp() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let form = db
        .repo
        .create_form(&owner, shrub_request("Jane", "Doe", 3))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let update = FormUpdate {
        common: CommonFieldsPatch {
            town: Some("Durham".into()),
            call_before: Some(false),
            ..Default::default()
        },
        details: Some(DetailsPatch::Shrub(ShrubPatch {
            num_shrubs: Some(9),
            ..Default::default()
        })),
    };
    let updated = db.repo.update_form(&owner, form.id, update).await.unwrap();
    assert_eq!(updated.form_type, FormType::Shrub);
    assert_eq!(updated.created_at, form.created_at);
    assert!(updated.updated_at > form.updated_at);
    assert_eq!(updated.common.town, "Durham");
    assert_eq!(updated.common.first_name, "Jane");
    assert!(!updated.common.call_before);

    // A second, details-only update still moves the timestamp.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let details_only = FormUpdate {
        details: Some(DetailsPatch::Shrub(ShrubPatch {
            flea_only: Some(true),
            ..Default::default()
        })),
        ..Default::default()
    };
    let again = db.repo.update_form(&owner, form.id, details_only).await.unwrap();
    assert!(again.updated_at > updated.updated_at);

    let view = db.repo.get_form_view(&owner, form.id).await.unwrap();
    assert_eq!(view.form_type(), FormType::Shrub);
    assert_eq!(view.shrub(), Some(&ShrubDetails { flea_only: true, num_shrubs: 9 }));
}

#[tokio::test]
async fn test_mismatched_detail_patch_is_rejected_and_rolled_back() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let form = db
        .repo
        .create_form(&owner, shrub_request("Jane", "Doe", 3))
        .await
        .unwrap();

    let update = FormUpdate {
        common: CommonFieldsPatch { last_name: Some("Smith".into()), ..Default::default() },
        details: Some(DetailsPatch::Pesticide(PesticidePatch {
            lawn_area_sq_ft: Some(100),
            ..Default::default()
        })),
    };
    let err = db.repo.update_form(&owner, form.id, update).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let view = db.repo.get_form_view(&owner, form.id).await.unwrap();
    assert_eq!(view.form.common.last_name, "Doe");
    assert_eq!(view.form.updated_at, form.updated_at);
    assert_eq!(db.count_rows("pesticide_details", form.id).await, 0);
}

#[tokio::test]
async fn test_pesticide_update_replaces_application_lines() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let chemical = db.chemical().await;
    let form = db
        .repo
        .create_form(
            &owner,
            pesticide_request(
                "Sam",
                "Reed",
                vec![application(chemical, "FY"), application(chemical, "BY")],
            ),
        )
        .await
        .unwrap();

    let update = FormUpdate {
        details: Some(DetailsPatch::Pesticide(PesticidePatch {
            fert_only: Some(true),
            applications: Some(vec![application(chemical, "SY")]),
            ..Default::default()
        })),
        ..Default::default()
    };
    db.repo.update_form(&owner, form.id, update).await.unwrap();

    let view = db.repo.get_form_view(&owner, form.id).await.unwrap();
    let details = view.pesticide().expect("pesticide details");
    assert!(details.fert_only);
    assert_eq!(details.lawn_area_sq_ft, 8000);
    assert_eq!(details.applications.len(), 1);
    assert_eq!(details.applications[0].location_code, "SY");
}

#[tokio::test]
async fn test_delete_cascades_to_details_and_lines() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;
    let chemical = db.chemical().await;
    let form = db
        .repo
        .create_form(&owner, pesticide_request("Sam", "Reed", vec![application(chemical, "FY")]))
        .await
        .unwrap();
    assert_eq!(db.count_rows("pesticide_applications", form.id).await, 1);

    db.repo.delete_form(&owner, form.id).await.unwrap();

    assert_eq!(db.count_rows("pesticide_details", form.id).await, 0);
    assert_eq!(db.count_rows("pesticide_applications", form.id).await, 0);
    let err = db.repo.get_form_view(&owner, form.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundOrUnauthorized);

    // Deleting twice is indistinguishable from deleting a form that never existed.
    let err = db.repo.delete_form(&owner, form.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundOrUnauthorized);
}

#[tokio::test]
async fn test_negative_count_is_a_validation_failure() {
    let Some(db) = test_db().await else {
        return;
    };
    let owner = db.employee().await;

    let err = db
        .repo
        .create_form(&owner, shrub_request("Jane", "Doe", -4))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(db.count_forms(&owner).await, 0);
}
