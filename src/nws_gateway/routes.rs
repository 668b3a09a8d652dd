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

//! Routes exposed by the gateway, one per api.weather.gov operation.

use crate::route::ParamType::{self, Integer, String as Str};
use crate::route::{FromParam, RouteDefinition, RouteTable, RouteTableError};
use crate::upstream::Operation;

macro_rules! param_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident $name:literal) => {
        $name
    };
}

/// Binding that reads each field of an `Operation` variant from the route parameter of the
/// same name (or the one given with `field = "name"`) and, with `with query`, passes every
/// declared query parameter through.
macro_rules! bind {
    ($variant:ident {}) => {
        |_| Ok(Operation::$variant {})
    };
    ($variant:ident {} with query) => {
        |p| Ok(Operation::$variant { query: p.query() })
    };
    ($variant:ident { $($field:ident $(= $name:literal)?),+ } $(with $query:ident)?) => {
        |p| {
            Ok(Operation::$variant {
                $($field: FromParam::from_param(p, param_name!($field $($name)?))?,)+
                $($query: p.query(),)?
            })
        }
    };
}

const ALERTS_ACTIVE_QUERY: &[(&str, ParamType)] = &[
    ("status", Str),
    ("message_type", Str),
    ("event", Str),
    ("code", Str),
    ("area", Str),
    ("point", Str),
    ("region", Str),
    ("region_type", Str),
    ("zone", Str),
    ("urgency", Str),
    ("severity", Str),
    ("certainty", Str),
    ("limit", Integer),
];

const ALERTS_QUERY: &[(&str, ParamType)] = &[
    ("active", Str),
    ("start", Str),
    ("end", Str),
    ("status", Str),
    ("message_type", Str),
    ("event", Str),
    ("code", Str),
    ("area", Str),
    ("point", Str),
    ("region", Str),
    ("region_type", Str),
    ("zone", Str),
    ("urgency", Str),
    ("severity", Str),
    ("certainty", Str),
    ("limit", Integer),
    ("cursor", Str),
];

const SIGMET_QUERY: &[(&str, ParamType)] = &[
    ("start", Str),
    ("end", Str),
    ("date", Str),
    ("atsu", Str),
    ("sequence", Integer),
];

const PRODUCTS_QUERY: &[(&str, ParamType)] = &[
    ("location", Str),
    ("start", Str),
    ("end", Str),
    ("office", Str),
    ("wmoid", Str),
    ("type", Str),
    ("limit", Integer),
];

const STATIONS_QUERY: &[(&str, ParamType)] = &[("id", Str), ("state", Str), ("limit", Integer), ("cursor", Str)];

const OBSERVATIONS_QUERY: &[(&str, ParamType)] = &[("start", Str), ("end", Str), ("limit", Integer)];

const ZONES_QUERY: &[(&str, ParamType)] = &[
    ("id", Str),
    ("area", Str),
    ("region", Str),
    ("type", Str),
    ("point", Str),
    ("include_geometry", Str),
    ("limit", Integer),
    ("effective", Str),
];

/// Build the table of every route the gateway forwards to api.weather.gov.
pub fn nws_routes() -> Result<RouteTable, RouteTableError> {
    RouteTable::new(nws_route_definitions())
}

pub fn nws_route_definitions() -> Vec<RouteDefinition> {
    vec![
        // Alerts
        RouteDefinition::get("/alerts/active", bind!(AlertsActive {} with query)).with_query(ALERTS_ACTIVE_QUERY),
        RouteDefinition::get("/alerts/active/area/{area}", bind!(AlertsActiveArea { area })),
        RouteDefinition::get("/alerts/active/count", bind!(AlertsActiveCount {})),
        RouteDefinition::get("/alerts/active/region/{region}", bind!(AlertsActiveRegion { region })),
        RouteDefinition::get("/alerts/active/zone/{zone_id}", bind!(AlertsActiveZone { zone_id })),
        RouteDefinition::get("/alerts/types", bind!(AlertsTypes {})),
        RouteDefinition::get("/alerts", bind!(AlertsQuery {} with query)).with_query(ALERTS_QUERY),
        RouteDefinition::get("/alerts/{id}", bind!(AlertsSingle { id })),
        // Aviation
        RouteDefinition::get(
            "/aviation/cwsus/{cwsu_id}/cwas/{var_date}/{sequence:int}",
            bind!(Cwa { cwsu_id, var_date, sequence }),
        ),
        RouteDefinition::get("/aviation/cwsus/{cwsu_id}/cwas", bind!(Cwas { cwsu_id })),
        RouteDefinition::get("/aviation/cwsus/{cwsu_id}", bind!(Cwsu { cwsu_id })),
        RouteDefinition::get("/aviation/sigmets/{atsu}/{var_date}/{time}", bind!(Sigmet { atsu, var_date, time })),
        RouteDefinition::get("/aviation/sigmets", bind!(SigmetQuery {} with query)).with_query(SIGMET_QUERY),
        RouteDefinition::get("/aviation/sigmets/{atsu}", bind!(SigmetsByAtsu { atsu })),
        RouteDefinition::get("/aviation/sigmets/{atsu}/{var_date}", bind!(SigmetsByAtsuByDate { atsu, var_date })),
        // Glossary
        RouteDefinition::get("/glossary", bind!(Glossary {})),
        // Gridpoints
        RouteDefinition::get("/gridpoints/{wfo}/{x:int},{y:int}", bind!(Gridpoint { wfo, x, y })),
        RouteDefinition::get("/gridpoints/{wfo}/{x:int},{y:int}/forecast", bind!(GridpointForecast { wfo, x, y })),
        RouteDefinition::get(
            "/gridpoints/{wfo}/{x:int},{y:int}/forecast/hourly",
            bind!(GridpointForecastHourly { wfo, x, y }),
        ),
        RouteDefinition::get("/gridpoints/{wfo}/{x:int},{y:int}/stations", bind!(GridpointStations { wfo, x, y })),
        // Icons
        RouteDefinition::get("/icons/{icon_set}/{time_of_day}/{first}", bind!(Icons { icon_set, time_of_day, first })),
        RouteDefinition::get(
            "/icons/{icon_set}/{time_of_day}/{first}/{second}",
            bind!(IconsDualCondition { icon_set, time_of_day, first, second }),
        ),
        RouteDefinition::get("/icons", bind!(IconsSummary {})),
        // Products
        RouteDefinition::get(
            "/products/types/{type_id}/locations/{location_id}/latest",
            bind!(LatestProductTypeLocation { type_id, location_id }),
        ),
        RouteDefinition::get("/products/locations/{location_id}/types", bind!(LocationProducts { location_id })),
        RouteDefinition::get("/products/locations", bind!(ProductLocations {})),
        RouteDefinition::get("/products/types", bind!(ProductTypes {})),
        RouteDefinition::get("/products/{product_id}", bind!(Product { product_id })),
        RouteDefinition::get("/products", bind!(ProductsQuery {} with query)).with_query(PRODUCTS_QUERY),
        RouteDefinition::get("/products/types/{type_id}", bind!(ProductsType { type_id })),
        RouteDefinition::get(
            "/products/types/{type_id}/locations/{location_id}",
            bind!(ProductsTypeLocation { type_id, location_id }),
        ),
        RouteDefinition::get("/products/types/{type_id}/locations", bind!(ProductsTypeLocations { type_id })),
        // Stations and observations
        RouteDefinition::get("/stations/{station_id}", bind!(ObsStation { station_id })),
        RouteDefinition::get("/stations", bind!(ObsStations {} with query)).with_query(STATIONS_QUERY),
        RouteDefinition::get(
            "/stations/{station_id}/observations/latest",
            bind!(StationObservationLatest { station_id }),
        ),
        RouteDefinition::get(
            "/stations/{station_id}/observations",
            bind!(StationObservationList { station_id } with query),
        )
        .with_query(OBSERVATIONS_QUERY),
        RouteDefinition::get(
            "/stations/{station_id}/observations/{time}",
            bind!(StationObservationTime { station_id, time }),
        ),
        RouteDefinition::get(
            "/stations/{station_id}/tafs/{var_date}/{time}",
            bind!(Taf { station_id, var_date, time }),
        ),
        RouteDefinition::get("/stations/{station_id}/tafs", bind!(Tafs { station_id })),
        // Offices
        RouteDefinition::get("/offices/{office_id}", bind!(Office { office_id })),
        RouteDefinition::get(
            "/offices/{office_id}/headlines/{headline_id}",
            bind!(OfficeHeadline { office_id, headline_id }),
        ),
        RouteDefinition::get("/offices/{office_id}/headlines", bind!(OfficeHeadlines { office_id })),
        // Points
        RouteDefinition::get("/points/{latitude:float},{longitude:float}", bind!(Point { latitude, longitude })),
        RouteDefinition::get(
            "/points/{latitude:float},{longitude:float}/radio",
            bind!(PointRadio { latitude, longitude }),
        ),
        RouteDefinition::get(
            "/points/{latitude:float},{longitude:float}/stations",
            bind!(PointStations { latitude, longitude }),
        ),
        // Radar
        RouteDefinition::get("/radar/profilers/{station_id}", bind!(RadarProfiler { station_id })),
        RouteDefinition::get("/radar/queues/{host}", bind!(RadarQueue { host })),
        RouteDefinition::get("/radar/servers/{id}", bind!(RadarServer { server_id = "id" })),
        RouteDefinition::get("/radar/servers", bind!(RadarServers {})),
        RouteDefinition::get("/radar/stations/{station_id}", bind!(RadarStation { station_id })),
        RouteDefinition::get("/radar/stations/{station_id}/alarms", bind!(RadarStationAlarms { station_id })),
        RouteDefinition::get("/radar/stations", bind!(RadarStations {})),
        // Satellite thumbnails
        RouteDefinition::get("/thumbnails/satellite/{area}", bind!(SatelliteThumbnails { area })),
        // Zones
        RouteDefinition::get("/zones/{zone_type}/{zone_id}", bind!(Zone { zone_type, zone_id })),
        RouteDefinition::get("/zones/{zone_type}/{zone_id}/forecast", bind!(ZoneForecast { zone_type, zone_id })),
        RouteDefinition::get("/zones", bind!(ZoneList {} with query)).with_query(ZONES_QUERY),
        RouteDefinition::get("/zones/{zone_type}", bind!(ZoneListType { zone_type })),
        RouteDefinition::get("/zones/forecast/{zone_id}/observations", bind!(ZoneObs { zone_id })),
        RouteDefinition::get("/zones/forecast/{zone_id}/stations", bind!(ZoneStations { zone_id })),
    ]
}
