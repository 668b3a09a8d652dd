// nws_gateway - HTTP gateway for api.weather.gov
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Operations exposed by api.weather.gov and the trait used to invoke them.

use crate::client::ClientError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// A coerced parameter value passed to an upstream operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// A named argument of an upstream operation, using the upstream's name for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: &'static str,
    pub value: ParamValue,
}

impl Argument {
    pub fn new<V: Into<ParamValue>>(name: &'static str, value: V) -> Self {
        Argument {
            name,
            value: value.into(),
        }
    }
}

/// Optional query string arguments, in the order they were supplied.
pub type Query = Vec<Argument>;

/// Location of an operation relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: Vec<String>,
    pub query: Vec<(&'static str, String)>,
}

/// Something that can perform upstream operations, typically `WeatherGovClient`.
///
/// Implementations must be safe to share between concurrent requests without
/// any external locking.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn invoke(&self, operation: &Operation) -> Result<Value, ClientError>;
}

macro_rules! argument_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident $name:literal) => {
        $name
    };
}

macro_rules! operations {
    ($(
        $variant:ident($id:literal, $path:literal) {
            $($field:ident $(as $name:literal)?: $ty:ty),* $(,)?
        } $(with $query:ident)?;
    )*) => {
        /// Every read operation supported by the upstream API.
        ///
        /// Fields are named for the route parameters that populate them. Arguments are named
        /// for the upstream, which differs in a few places (`icon_set` is sent as `set`,
        /// `zone_type` is sent as `type`).
        #[derive(Debug, Clone, PartialEq)]
        pub enum Operation {
            $($variant { $($field: $ty,)* $($query: Query,)? },)*
        }

        impl Operation {
            /// Stable identifier of this operation, e.g. `gridpoint_forecast`.
            pub fn id(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => $id,)*
                }
            }

            /// Upstream path template with placeholders named for upstream arguments.
            pub fn path_template(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => $path,)*
                }
            }

            /// Arguments substituted into the path, under their upstream names.
            pub fn path_arguments(&self) -> Vec<Argument> {
                match self {
                    $(Self::$variant { $($field,)* .. } => vec![
                        $(Argument::new(argument_name!($field $($name)?), $field.clone()),)*
                    ],)*
                }
            }

            /// Query string arguments, empty for operations that accept none.
            pub fn query(&self) -> &[Argument] {
                match self {
                    $($(Self::$variant { $query, .. } => $query.as_slice(),)?)*
                    #[allow(unreachable_patterns)]
                    _ => &[],
                }
            }
        }
    };
}

operations! {
    AlertsActive("alerts_active", "/alerts/active") {} with query;
    AlertsActiveArea("alerts_active_area", "/alerts/active/area/{area}") { area: String };
    AlertsActiveCount("alerts_active_count", "/alerts/active/count") {};
    AlertsActiveRegion("alerts_active_region", "/alerts/active/region/{region}") { region: String };
    AlertsActiveZone("alerts_active_zone", "/alerts/active/zone/{zone_id}") { zone_id: String };
    AlertsQuery("alerts_query", "/alerts") {} with query;
    AlertsSingle("alerts_single", "/alerts/{id}") { id: String };
    AlertsTypes("alerts_types", "/alerts/types") {};

    Cwa("cwa", "/aviation/cwsus/{cwsu_id}/cwas/{var_date}/{sequence}") {
        cwsu_id: String,
        var_date: String,
        sequence: i64,
    };
    Cwas("cwas", "/aviation/cwsus/{cwsu_id}/cwas") { cwsu_id: String };
    Cwsu("cwsu", "/aviation/cwsus/{cwsu_id}") { cwsu_id: String };
    Sigmet("sigmet", "/aviation/sigmets/{atsu}/{var_date}/{time}") {
        atsu: String,
        var_date: String,
        time: String,
    };
    SigmetQuery("sigmet_query", "/aviation/sigmets") {} with query;
    SigmetsByAtsu("sigmets_by_atsu", "/aviation/sigmets/{atsu}") { atsu: String };
    SigmetsByAtsuByDate("sigmets_by_atsuby_date", "/aviation/sigmets/{atsu}/{var_date}") {
        atsu: String,
        var_date: String,
    };

    Glossary("glossary", "/glossary") {};

    Gridpoint("gridpoint", "/gridpoints/{wfo}/{x},{y}") { wfo: String, x: i64, y: i64 };
    GridpointForecast("gridpoint_forecast", "/gridpoints/{wfo}/{x},{y}/forecast") {
        wfo: String,
        x: i64,
        y: i64,
    };
    GridpointForecastHourly("gridpoint_forecast_hourly", "/gridpoints/{wfo}/{x},{y}/forecast/hourly") {
        wfo: String,
        x: i64,
        y: i64,
    };
    GridpointStations("gridpoint_stations", "/gridpoints/{wfo}/{x},{y}/stations") {
        wfo: String,
        x: i64,
        y: i64,
    };

    Icons("icons", "/icons/{set}/{time_of_day}/{first}") {
        icon_set as "set": String,
        time_of_day: String,
        first: String,
    };
    IconsDualCondition("icons_dual_condition", "/icons/{set}/{time_of_day}/{first}/{second}") {
        icon_set as "set": String,
        time_of_day: String,
        first: String,
        second: String,
    };
    IconsSummary("icons_summary", "/icons") {};

    LatestProductTypeLocation(
        "latest_product_type_location",
        "/products/types/{type_id}/locations/{location_id}/latest"
    ) {
        type_id: String,
        location_id: String,
    };
    LocationProducts("location_products", "/products/locations/{location_id}/types") { location_id: String };
    Product("product", "/products/{product_id}") { product_id: String };
    ProductLocations("product_locations", "/products/locations") {};
    ProductTypes("product_types", "/products/types") {};
    ProductsQuery("products_query", "/products") {} with query;
    ProductsType("products_type", "/products/types/{type_id}") { type_id: String };
    ProductsTypeLocation("products_type_location", "/products/types/{type_id}/locations/{location_id}") {
        type_id: String,
        location_id: String,
    };
    ProductsTypeLocations("products_type_locations", "/products/types/{type_id}/locations") { type_id: String };

    ObsStation("obs_station", "/stations/{station_id}") { station_id: String };
    ObsStations("obs_stations", "/stations") {} with query;
    StationObservationLatest("station_observation_latest", "/stations/{station_id}/observations/latest") {
        station_id: String,
    };
    StationObservationList("station_observation_list", "/stations/{station_id}/observations") {
        station_id: String,
    } with query;
    StationObservationTime("station_observation_time", "/stations/{station_id}/observations/{time}") {
        station_id: String,
        time: String,
    };
    Taf("taf", "/stations/{station_id}/tafs/{var_date}/{time}") {
        station_id: String,
        var_date: String,
        time: String,
    };
    Tafs("tafs", "/stations/{station_id}/tafs") { station_id: String };

    Office("office", "/offices/{office_id}") { office_id: String };
    OfficeHeadline("office_headline", "/offices/{office_id}/headlines/{headline_id}") {
        office_id: String,
        headline_id: String,
    };
    OfficeHeadlines("office_headlines", "/offices/{office_id}/headlines") { office_id: String };

    Point("point", "/points/{latitude},{longitude}") { latitude: f64, longitude: f64 };
    PointRadio("point_radio", "/points/{latitude},{longitude}/radio") { latitude: f64, longitude: f64 };
    PointStations("point_stations", "/points/{latitude},{longitude}/stations") { latitude: f64, longitude: f64 };

    RadarProfiler("radar_profiler", "/radar/profilers/{station_id}") { station_id: String };
    RadarQueue("radar_queue", "/radar/queues/{host}") { host: String };
    RadarServer("radar_server", "/radar/servers/{id}") { server_id as "id": String };
    RadarServers("radar_servers", "/radar/servers") {};
    RadarStation("radar_station", "/radar/stations/{station_id}") { station_id: String };
    RadarStationAlarms("radar_station_alarms", "/radar/stations/{station_id}/alarms") { station_id: String };
    RadarStations("radar_stations", "/radar/stations") {};

    SatelliteThumbnails("satellite_thumbnails", "/thumbnails/satellite/{area}") { area: String };

    Zone("zone", "/zones/{type}/{zone_id}") { zone_type as "type": String, zone_id: String };
    ZoneForecast("zone_forecast", "/zones/{type}/{zone_id}/forecast") {
        zone_type as "type": String,
        zone_id: String,
    };
    ZoneList("zone_list", "/zones") {} with query;
    ZoneListType("zone_list_type", "/zones/{type}") { zone_type as "type": String };
    ZoneObs("zone_obs", "/zones/forecast/{zone_id}/observations") { zone_id: String };
    ZoneStations("zone_stations", "/zones/forecast/{zone_id}/stations") { zone_id: String };
}

impl Operation {
    /// All arguments of this operation: path arguments followed by query arguments.
    pub fn arguments(&self) -> Vec<Argument> {
        let mut args = self.path_arguments();
        args.extend(self.query().iter().cloned());
        args
    }

    /// Upstream path segments and query pairs for this operation.
    ///
    /// Segments are returned unencoded, callers are expected to percent-encode them.
    pub fn resource(&self) -> Resource {
        let args = self.path_arguments();
        let path = self
            .path_template()
            .trim_start_matches('/')
            .split('/')
            .map(|segment| render_segment(segment, &args))
            .collect();

        let query = self
            .query()
            .iter()
            .map(|a| (a.name, a.value.to_string()))
            .collect();

        Resource { path, query }
    }
}

fn render_segment(segment: &str, args: &[Argument]) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = match after.find('}') {
            Some(end) => end,
            None => break,
        };

        let name = &after[..end];
        match args.iter().find(|a| a.name == name) {
            Some(a) => out.push_str(&a.value.to_string()),
            None => out.push_str(&rest[start..start + end + 2]),
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod test {
    use super::{Argument, Operation, ParamValue};

    #[test]
    fn test_renamed_arguments() {
        let op = Operation::IconsDualCondition {
            icon_set: "land".to_owned(),
            time_of_day: "day".to_owned(),
            first: "skc".to_owned(),
            second: "few".to_owned(),
        };

        let names: Vec<&str> = op.arguments().iter().map(|a| a.name).collect();
        assert_eq!(vec!["set", "time_of_day", "first", "second"], names);
        assert_eq!("icons_dual_condition", op.id());

        let op = Operation::ZoneListType {
            zone_type: "forecast".to_owned(),
        };
        assert_eq!(vec![Argument::new("type", "forecast")], op.arguments());
    }

    #[test]
    fn test_resource_composite_segment() {
        let op = Operation::GridpointForecastHourly {
            wfo: "LWX".to_owned(),
            x: 96,
            y: 70,
        };

        let res = op.resource();
        assert_eq!(vec!["gridpoints", "LWX", "96,70", "forecast", "hourly"], res.path);
        assert!(res.query.is_empty());
    }

    #[test]
    fn test_resource_float_segment() {
        let op = Operation::Point {
            latitude: 38.99,
            longitude: -77.01,
        };

        assert_eq!(vec!["points", "38.99,-77.01"], op.resource().path);
    }

    #[test]
    fn test_resource_query() {
        let op = Operation::StationObservationList {
            station_id: "KBOS".to_owned(),
            query: vec![Argument::new("limit", 5_i64), Argument::new("start", "2022-01-01T00:00:00Z")],
        };

        let res = op.resource();
        assert_eq!(vec!["stations", "KBOS", "observations"], res.path);
        assert_eq!(
            vec![("limit", "5".to_owned()), ("start", "2022-01-01T00:00:00Z".to_owned())],
            res.query
        );
        assert_eq!(3, op.arguments().len());
    }

    #[test]
    fn test_resource_no_arguments() {
        let op = Operation::AlertsActiveCount {};
        assert_eq!(vec!["alerts", "active", "count"], op.resource().path);
        assert!(op.arguments().is_empty());
        assert!(op.query().is_empty());
    }

    #[test]
    fn test_param_value_display() {
        assert_eq!("KBOS", ParamValue::from("KBOS").to_string());
        assert_eq!("-3", ParamValue::from(-3_i64).to_string());
        assert_eq!("-77.01", ParamValue::from(-77.01).to_string());
    }
}
