//! Response payloads of the report endpoints.
//!
//! Builders take the fetched cars and the request time; the same input always
//! yields the same payload.

use crate::aggregate::{
    CategoryActivity, CategorySummary, Efficiency, Overview, TopPerformers, Utilization,
    category_activity, category_summaries, group_counts, insights,
};
use crate::enrichment::{
    CarAnalytics, CategoryComparison, Scores, ranks, recommendations, signed_percent,
};
use crate::models::{Car, CarStatus, number};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use upstream::join::round2;

const EMPTY_GARAGE: &str = "No cars in garage";

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[derive(Debug, Serialize)]
pub struct EnrichedCar {
    #[serde(flatten)]
    pub car: Car,
    pub analytics: CarAnalytics,
}

#[derive(Debug, Serialize)]
pub struct CompleteReport {
    pub service: String,
    pub report_type: &'static str,
    pub total_cars: usize,
    pub timestamp: String,
    pub cars: Vec<EnrichedCar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn complete_report(service: &str, cars: Vec<Car>, now: DateTime<Utc>) -> CompleteReport {
    let message = cars.is_empty().then_some(EMPTY_GARAGE);
    let cars: Vec<EnrichedCar> = cars
        .into_iter()
        .map(|car| EnrichedCar {
            analytics: CarAnalytics::for_car(&car, now),
            car,
        })
        .collect();

    CompleteReport {
        service: service.to_string(),
        report_type: "complete",
        total_cars: cars.len(),
        timestamp: timestamp(now),
        cars,
        message,
    }
}

#[derive(Debug, Serialize)]
pub struct BasicInfo {
    #[serde(serialize_with = "number")]
    pub year: f64,
    pub category: String,
    pub status: CarStatus,
    #[serde(serialize_with = "number")]
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct PerformanceMetrics {
    #[serde(serialize_with = "number")]
    pub horsepower: f64,
    #[serde(serialize_with = "number")]
    pub top_speed: f64,
    pub acceleration: f64,
}

#[derive(Debug, Serialize)]
pub struct DetailedAnalysis {
    pub performance_score: f64,
    pub acceleration_score: f64,
    pub speed_score: f64,
    pub power_score: f64,
    pub ranking_in_garage: usize,
    pub total_cars: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub category: String,
    pub cars_in_category: usize,
    pub vs_category_avg_hp: String,
    pub vs_category_avg_speed: String,
}

impl From<CategoryComparison> for CategoryView {
    fn from(comparison: CategoryComparison) -> Self {
        Self {
            category: comparison.category,
            cars_in_category: comparison.cars_in_category,
            vs_category_avg_hp: signed_percent(comparison.hp_deviation),
            vs_category_avg_speed: signed_percent(comparison.speed_deviation),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailedReport {
    pub service: String,
    pub report_type: &'static str,
    pub car_id: u64,
    pub manufacturer: String,
    pub model: String,
    pub basic_info: BasicInfo,
    pub performance_metrics: PerformanceMetrics,
    pub detailed_analysis: DetailedAnalysis,
    pub category_comparison: CategoryView,
    pub recommendations: Vec<&'static str>,
    pub timestamp: String,
}

/// `None` when no car has `car_id`.
pub fn detailed_report(
    service: &str,
    cars: &[Car],
    car_id: u64,
    now: DateTime<Utc>,
) -> Option<DetailedReport> {
    let index = cars.iter().position(|c| c.id == car_id)?;
    let car = &cars[index];
    let scores = Scores::for_car(car);
    let ranking = ranks(cars)[index];

    Some(DetailedReport {
        service: service.to_string(),
        report_type: "detailed",
        car_id,
        manufacturer: car.manufacturer.clone(),
        model: car.model.clone(),
        basic_info: BasicInfo {
            year: car.year,
            category: car.category.clone(),
            status: car.status.clone(),
            price: car.price,
        },
        performance_metrics: PerformanceMetrics {
            horsepower: car.horsepower,
            top_speed: car.top_speed,
            acceleration: car.acceleration,
        },
        detailed_analysis: DetailedAnalysis {
            performance_score: round2(scores.overall),
            acceleration_score: round2(scores.acceleration),
            speed_score: round2(scores.speed),
            power_score: round2(scores.power),
            ranking_in_garage: ranking,
            total_cars: cars.len(),
        },
        category_comparison: CategoryComparison::for_car(car, cars).into(),
        recommendations: recommendations(car, &scores),
        timestamp: timestamp(now),
    })
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub service: String,
    pub summary_type: &'static str,
    pub timestamp: String,
    pub overview: Overview,
    pub by_category: IndexMap<String, CategorySummary>,
    pub by_status: IndexMap<String, usize>,
    pub by_manufacturer: IndexMap<String, usize>,
    pub top_performers: Option<TopPerformers>,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn summary(service: &str, cars: &[Car], now: DateTime<Utc>) -> Summary {
    let overview = Overview::of(cars);
    Summary {
        service: service.to_string(),
        summary_type: "executive",
        timestamp: timestamp(now),
        by_category: category_summaries(cars),
        by_status: group_counts(cars, |c| c.status.as_str()),
        by_manufacturer: group_counts(cars, |c| c.manufacturer.as_str()),
        top_performers: TopPerformers::of(cars),
        insights: insights(cars, &overview),
        overview,
        message: cars.is_empty().then_some(EMPTY_GARAGE),
    }
}

#[derive(Debug, Serialize)]
pub struct Activity {
    pub service: String,
    pub activity_type: &'static str,
    pub timestamp: String,
    pub utilization: Utilization,
    pub efficiency_metrics: Efficiency,
    pub category_analysis: IndexMap<String, CategoryActivity>,
    pub alerts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub fn activity(service: &str, cars: &[Car], now: DateTime<Utc>) -> Activity {
    let utilization = Utilization::of(cars);
    Activity {
        service: service.to_string(),
        activity_type: "operational",
        timestamp: timestamp(now),
        alerts: utilization.alerts(),
        utilization,
        efficiency_metrics: Efficiency::of(cars),
        category_analysis: category_activity(cars),
        message: cars.is_empty().then_some(EMPTY_GARAGE),
    }
}
