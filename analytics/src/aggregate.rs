//! Collection-level statistics over one fetch of the garage.

use crate::enrichment::value_per_hp;
use crate::models::{Car, CarStatus, number};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use upstream::join::round2;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Overview {
    pub total_cars: usize,
    #[serde(serialize_with = "number")]
    pub total_value: f64,
    pub avg_horsepower: f64,
    pub avg_top_speed: f64,
    pub avg_price: f64,
    pub avg_acceleration: f64,
}

impl Overview {
    pub fn of(cars: &[Car]) -> Self {
        if cars.is_empty() {
            return Self::default();
        }
        let total_value = cars.iter().map(|c| c.price).sum::<f64>();

        Self {
            total_cars: cars.len(),
            total_value,
            avg_horsepower: round2(mean(cars, |c| c.horsepower)),
            avg_top_speed: round2(mean(cars, |c| c.top_speed)),
            avg_price: round2(mean(cars, |c| c.price)),
            avg_acceleration: round2(mean(cars, |c| c.acceleration)),
        }
    }
}

/// Unrounded mean of `metric`; 0 for no cars.
fn mean(cars: &[Car], metric: fn(&Car) -> f64) -> f64 {
    if cars.is_empty() {
        return 0.0;
    }
    cars.iter().map(metric).sum::<f64>() / cars.len() as f64
}

/// Occurrences of each key, in first-seen order.
pub fn group_counts<'a>(
    cars: &'a [Car],
    key: impl Fn(&'a Car) -> &'a str,
) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for car in cars {
        *counts.entry(key(car).to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategorySummary {
    pub count: usize,
    pub avg_hp: f64,
    pub avg_price: f64,
}

pub fn category_summaries(cars: &[Car]) -> IndexMap<String, CategorySummary> {
    let mut totals: IndexMap<&str, (usize, f64, f64)> = IndexMap::new();
    for car in cars {
        let entry = totals.entry(car.category.as_str()).or_insert((0, 0.0, 0.0));
        entry.0 += 1;
        entry.1 += car.horsepower;
        entry.2 += car.price;
    }

    totals
        .into_iter()
        .map(|(category, (count, hp, price))| {
            let summary = CategorySummary {
                count,
                avg_hp: round2(hp / count as f64),
                avg_price: round2(price / count as f64),
            };
            (category.to_string(), summary)
        })
        .collect()
}

/// Extremal cars rendered as display strings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopPerformers {
    pub most_powerful: String,
    pub fastest: String,
    pub quickest: String,
    pub most_expensive: String,
    pub best_value: String,
}

impl TopPerformers {
    /// `None` for an empty garage.
    pub fn of(cars: &[Car]) -> Option<Self> {
        let most_powerful = first_best(cars, |a, b| a.horsepower.total_cmp(&b.horsepower))?;
        let fastest = first_best(cars, |a, b| a.top_speed.total_cmp(&b.top_speed))?;
        let quickest = first_best(cars, |a, b| b.acceleration.total_cmp(&a.acceleration))?;
        let most_expensive = first_best(cars, |a, b| a.price.total_cmp(&b.price))?;

        let rated: Vec<(&Car, f64)> = cars
            .iter()
            .filter_map(|car| value_per_hp(car).map(|ratio| (car, ratio)))
            .collect();
        let best_value = match first_best(&rated, |a, b| b.1.total_cmp(&a.1)) {
            Some((car, ratio)) => format!("{} (${ratio:?}/HP)", car.display_name()),
            // No car has horsepower to divide by
            None => format!("{} (n/a)", cars[0].display_name()),
        };

        Some(Self {
            most_powerful: format!(
                "{} ({} HP)",
                most_powerful.display_name(),
                most_powerful.horsepower
            ),
            fastest: format!("{} ({} mph)", fastest.display_name(), fastest.top_speed),
            quickest: format!(
                "{} ({:?}s 0-60)",
                quickest.display_name(),
                quickest.acceleration
            ),
            most_expensive: format!(
                "{} (${})",
                most_expensive.display_name(),
                with_thousands(most_expensive.price)
            ),
            best_value,
        })
    }
}

/// Greatest element under `compare`; the earliest one wins ties.
fn first_best<T>(items: &[T], compare: impl Fn(&T, &T) -> Ordering) -> Option<&T> {
    items.iter().fold(None, |best, item| match best {
        Some(current) if compare(item, current) != Ordering::Greater => Some(current),
        _ => Some(item),
    })
}

/// `1234567.5` as `1,234,567.5`. Only the integral part is grouped.
pub fn with_thousands(value: f64) -> String {
    let text = value.abs().to_string();
    let (digits, fraction) = match text.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Threshold insights. Gates are tested on exact values; the overview only
/// carries rounded ones.
pub fn insights(cars: &[Car], overview: &Overview) -> Vec<String> {
    let mut out = Vec::new();
    if cars.len() >= 10 {
        out.push(format!("Garage has a substantial collection of {} cars", cars.len()));
    }
    if mean(cars, |c| c.horsepower) > 700.0 {
        out.push("High-performance focus with average HP above 700".to_string());
    }
    if overview.total_value > 3_000_000.0 {
        out.push("Premium inventory with total value over $3M".to_string());
    }
    let available = count_status(cars, &CarStatus::Available);
    if available as f64 > cars.len() as f64 * 0.5 {
        out.push(format!("Good availability: {available} cars ready for use"));
    }
    out
}

fn count_status(cars: &[Car], status: &CarStatus) -> usize {
    cars.iter().filter(|c| &c.status == status).count()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Utilization {
    pub total_cars: usize,
    pub active_cars: usize,
    pub inactive_cars: usize,
    /// Rounded to 2 places
    pub utilization_rate: f64,
    #[serde(skip)]
    exact_rate: f64,
    pub available_count: usize,
    pub racing_count: usize,
    pub maintenance_count: usize,
    pub sold_count: usize,
}

impl Utilization {
    pub fn of(cars: &[Car]) -> Self {
        let active_cars = cars.iter().filter(|c| c.status.is_active()).count();
        let utilization_rate = if cars.is_empty() {
            0.0
        } else {
            active_cars as f64 / cars.len() as f64 * 100.0
        };

        Self {
            total_cars: cars.len(),
            active_cars,
            inactive_cars: cars.len() - active_cars,
            utilization_rate: round2(utilization_rate),
            exact_rate: utilization_rate,
            available_count: count_status(cars, &CarStatus::Available),
            racing_count: count_status(cars, &CarStatus::Racing),
            maintenance_count: count_status(cars, &CarStatus::Maintenance),
            sold_count: count_status(cars, &CarStatus::Sold),
        }
    }

    pub fn alerts(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.total_cars == 0 {
            return out;
        }
        if self.maintenance_count > 0 {
            out.push(format!(
                "{} car(s) in maintenance need attention",
                self.maintenance_count
            ));
        }
        if self.exact_rate < 50.0 {
            out.push(format!("Low utilization rate: {:.1}%", self.exact_rate));
        }
        if self.available_count >= 5 {
            out.push(format!(
                "High-value inventory available ({} cars)",
                self.available_count
            ));
        }
        if self.sold_count as f64 > self.total_cars as f64 * 0.2 {
            out.push(format!(
                "Significant inventory turnover: {} cars sold",
                self.sold_count
            ));
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Efficiency {
    pub avg_hp_per_available_car: f64,
    #[serde(serialize_with = "number")]
    pub total_racing_power: f64,
    pub maintenance_backlog: usize,
}

impl Efficiency {
    pub fn of(cars: &[Car]) -> Self {
        let horsepower = |status: CarStatus| -> (usize, f64) {
            cars.iter()
                .filter(|c| c.status == status)
                .fold((0, 0.0), |(n, hp), c| (n + 1, hp + c.horsepower))
        };
        let (available, available_hp) = horsepower(CarStatus::Available);
        let (_, racing_hp) = horsepower(CarStatus::Racing);

        Self {
            avg_hp_per_available_car: round2(available_hp / available.max(1) as f64),
            total_racing_power: racing_hp,
            maintenance_backlog: count_status(cars, &CarStatus::Maintenance),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CategoryActivity {
    pub total: usize,
    pub available: usize,
    pub racing: usize,
    pub maintenance: usize,
    pub availability_rate: f64,
}

pub fn category_activity(cars: &[Car]) -> IndexMap<String, CategoryActivity> {
    let mut by_category: IndexMap<String, CategoryActivity> = IndexMap::new();
    for car in cars {
        let entry = by_category.entry(car.category.clone()).or_default();
        entry.total += 1;
        match car.status {
            CarStatus::Available => entry.available += 1,
            CarStatus::Racing => entry.racing += 1,
            CarStatus::Maintenance => entry.maintenance += 1,
            _ => {}
        }
    }
    for entry in by_category.values_mut() {
        entry.availability_rate = round2(entry.available as f64 / entry.total as f64 * 100.0);
    }
    by_category
}
