//! Landing data for whichever dashboard the caller routes to.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    appointments::{self, Appointment},
    auth::AnySession,
    dates,
    error::AppResult,
    exercises::{
        dto::{DailyProgress, ExerciseItem},
        services as exercise_services, Exercise,
    },
    payments::{
        dto::{MonthlyIncome, PaymentSummary},
        services as payment_services, Payment,
    },
    policy::DashboardKind,
    profiles::{model::ProfileView, services as profile_services},
    state::AppState,
    store::{Direction, Query, Stored},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}

#[derive(Debug, Serialize)]
#[serde(tag = "route", rename_all = "kebab-case")]
pub enum DashboardView {
    TherapistDashboard {
        patient_count: usize,
        pending_count: usize,
        patients: Vec<ProfileView>,
        appointments: Vec<Stored<Appointment>>,
        income: Vec<MonthlyIncome>,
    },
    PatientDashboard {
        profile: ProfileView,
        exercises: Vec<ExerciseItem>,
        payments: Vec<Stored<Payment>>,
        summary: PaymentSummary,
        progress: DailyProgress,
        appointments: Vec<Stored<Appointment>>,
    },
    PendingApproval {
        full_name: String,
    },
}

#[instrument(skip(state, session))]
pub async fn get_dashboard(State(state): State<AppState>, session: AnySession) -> AppResult<Json<DashboardView>> {
    let store = &session.store;
    let view = match session.route() {
        DashboardKind::TherapistDashboard => {
            let patients = profile_services::directory(store, None).await?;
            DashboardView::TherapistDashboard {
                patient_count: patients.len(),
                pending_count: patients.iter().filter(|p| !p.is_approved()).count(),
                patients: patients.iter().map(ProfileView::from).collect(),
                appointments: appointments::services::list(store, None).await?,
                income: payment_services::monthly_income(store).await?,
            }
        }
        DashboardKind::PatientDashboard => {
            let me = session.profile.id;
            let today = dates::today(state.config.clinic.utc_offset());
            let payments = store
                .list::<Payment>(Some(me), Query::new().order_by("date", Direction::Desc))
                .await?;
            DashboardView::PatientDashboard {
                profile: ProfileView::from(&session.profile),
                exercises: store
                    .list::<Exercise>(Some(me), Query::new())
                    .await?
                    .into_iter()
                    .map(exercise_services::to_item)
                    .collect(),
                summary: payment_services::summarize(&payments),
                payments,
                progress: exercise_services::daily_progress(store, me, today).await?,
                appointments: appointments::services::list(store, Some(me)).await?,
            }
        }
        // AnySession always carries a profile, so Unauthenticated cannot occur.
        DashboardKind::PendingApproval | DashboardKind::Unauthenticated => DashboardView::PendingApproval {
            full_name: session.profile.full_name.clone(),
        },
    };
    Ok(Json(view))
}
