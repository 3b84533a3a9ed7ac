//! CliFlo over plain HTTP form posts, with cookies holding the login.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};

use super::{Session, SessionError, StationSearch, Step, TableKind};
use crate::{
    config::SessionConfig,
    reading::{DataType, STATION_HEADER},
    table::RawTable,
};

const LOGIN_PATH: &str = "/pls/niwp/wa.logindb";
const LOGOUT_PATH: &str = "/pls/niwp/wa.logout";
const QUERY_FORM_PATH: &str = "/pls/niwp/wgenf.genform1";
const QUERY_SUBMIT_PATH: &str = "/pls/niwp/wgenf.genform1_proc";
const DATATYPE_PATH: &str = "/pls/niwp/wgenf.choose_datatype?cat=cat1";
const STATION_SEARCH_PATH: &str = "/pls/niwp/wstn.get_stn_html";
const STATION_UPDATE_PATH: &str = "/pls/niwp/wstn.update_stn_query";

const HOME_LINK: &str = "CliFlo Home";
const OBSERVATIONS_LINK: &str = "Daily and Hourly Observations";
const STATION_LIST_HEADER: &str = "AgentNumber";

pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub struct CliFloSession {
    client: Client,
    base_url: String,
    /// Fields of the query form, sent with every data request.
    query: BTreeMap<String, String>,
    station_list_page: Option<String>,
    authenticated: bool,
}

impl CliFloSession {
    pub async fn login(config: &SessionConfig, credentials: &Credentials) -> Result<Self, SessionError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| SessionError::Transport {
                step: Step::Login,
                source,
            })?;

        let mut session = CliFloSession {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query: BTreeMap::new(),
            station_list_page: None,
            authenticated: false,
        };

        let page = session
            .post(
                Step::Login,
                LOGIN_PATH,
                &[
                    ("cusername".to_string(), credentials.username.clone()),
                    ("cpwd".to_string(), credentials.password.clone()),
                    ("submit".to_string(), "login".to_string()),
                ],
            )
            .await?;
        if is_login_page(&page) {
            return Err(SessionError::NotAuthenticated);
        }
        session.authenticated = true;

        let form = session.get(Step::Login, QUERY_FORM_PATH).await?;
        session.query = form_fields(&form).into_iter().collect();
        info!(user = %credentials.username, "logged in to CliFlo");

        Ok(session)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/pls/niwp/{}", self.base_url, path)
        }
    }

    fn ensure_authenticated(&self) -> Result<(), SessionError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated)
        }
    }

    async fn get(&self, step: Step, path: &str) -> Result<String, SessionError> {
        debug!(%step, path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| transport(step, e))?;
        response.text().await.map_err(|e| transport(step, e))
    }

    async fn post(&self, step: Step, path: &str, form: &[(String, String)]) -> Result<String, SessionError> {
        debug!(%step, path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| transport(step, e))?;
        response.text().await.map_err(|e| transport(step, e))
    }

    async fn follow_link(&self, step: Step, page: &str, text: &str) -> Result<String, SessionError> {
        let href = link_href(page, text).ok_or_else(|| SessionError::ElementNotFound {
            step,
            what: format!("link `{}`", text),
        })?;
        self.get(step, &href).await
    }

    fn checked_result_page(&self, page: String) -> Result<String, SessionError> {
        if is_login_page(&page) {
            return Err(SessionError::NotAuthenticated);
        }
        if link_href(&page, HOME_LINK).is_none() {
            return Err(SessionError::ElementNotFound {
                step: Step::ReadResultTable,
                what: format!("link `{}`", HOME_LINK),
            });
        }
        Ok(page)
    }
}

#[async_trait]
impl Session for CliFloSession {
    async fn select_data_category(&mut self, data_type: DataType) -> Result<(), SessionError> {
        self.ensure_authenticated()?;
        let step = Step::SelectDataCategory;
        let (category, name) = data_type.category_path();

        let tree = self.get(step, DATATYPE_PATH).await?;
        let page = self.follow_link(step, &tree, OBSERVATIONS_LINK).await?;
        let page = self.follow_link(step, &page, category).await?;
        let page = self.follow_link(step, &page, name).await?;

        self.query.extend(form_fields(&page));
        debug!(%data_type, "data category selected");

        Ok(())
    }

    async fn search_stations(&mut self, search: &StationSearch) -> Result<(), SessionError> {
        self.ensure_authenticated()?;
        let form = [
            ("cstype".to_string(), "latlongc".to_string()),
            ("clat1".to_string(), search.latitude.to_string()),
            ("clong1".to_string(), search.longitude.to_string()),
            ("crad".to_string(), search.radius_km.to_string()),
            ("Submit".to_string(), "Get Station List".to_string()),
        ];
        let page = self.post(Step::SearchStations, STATION_SEARCH_PATH, &form).await?;
        if is_login_page(&page) {
            return Err(SessionError::NotAuthenticated);
        }
        self.station_list_page = Some(page);

        Ok(())
    }

    async fn select_station(&mut self, station: u32) -> Result<(), SessionError> {
        self.ensure_authenticated()?;
        let step = Step::SelectStation;
        let agent = station.to_string();

        let form = [
            ("cstype".to_string(), "ag".to_string()),
            ("cAgent".to_string(), agent.clone()),
            ("Submit".to_string(), "Get Station List".to_string()),
        ];
        let page = self.post(step, STATION_SEARCH_PATH, &form).await?;
        if !has_input(&page, "cstn", &agent) {
            return Err(SessionError::ElementNotFound {
                step,
                what: format!("station {}", station),
            });
        }

        let form = [
            ("cstn".to_string(), agent.clone()),
            ("Submit".to_string(), "Replace Selected Stations".to_string()),
        ];
        self.post(step, STATION_UPDATE_PATH, &form).await?;
        self.query.insert("cstn".to_string(), agent);

        Ok(())
    }

    async fn set_date_range(&mut self, start_year: i32, end_year: i32) -> Result<(), SessionError> {
        self.ensure_authenticated()?;
        if !self.query.contains_key("cstn") {
            return Err(SessionError::ElementNotFound {
                step: Step::SetDateRange,
                what: "selected station".to_string(),
            });
        }
        for (prefix, year) in [("date1", start_year), ("date2", end_year)] {
            self.query.insert(format!("{}_1", prefix), year.to_string());
            self.query.insert(format!("{}_2", prefix), "1".to_string());
            self.query.insert(format!("{}_3", prefix), "1".to_string());
            self.query.insert(format!("{}_4", prefix), "00".to_string());
        }

        Ok(())
    }

    async fn read_result_table(&mut self, kind: TableKind) -> Result<RawTable, SessionError> {
        self.ensure_authenticated()?;
        let step = Step::ReadResultTable;

        let (page, marker) = match kind {
            TableKind::StationList => {
                let page = self
                    .station_list_page
                    .clone()
                    .ok_or_else(|| SessionError::ElementNotFound {
                        step,
                        what: "station list".to_string(),
                    })?;
                (page, STATION_LIST_HEADER)
            }
            TableKind::Observations => {
                let mut form: Vec<(String, String)> =
                    self.query.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                form.push(("submit_sq".to_string(), "Send Query".to_string()));
                (self.post(step, QUERY_SUBMIT_PATH, &form).await?, STATION_HEADER)
            }
        };

        let page = self.checked_result_page(page)?;
        RawTable::from_html(&page, marker).map_err(|e| SessionError::ElementNotFound {
            step,
            what: e.to_string(),
        })
    }

    async fn logout(&mut self) -> Result<(), SessionError> {
        if !self.authenticated {
            return Ok(());
        }
        self.authenticated = false;
        self.get(Step::Logout, LOGOUT_PATH).await?;
        info!("logged out of CliFlo");

        Ok(())
    }
}

fn transport(step: Step, source: reqwest::Error) -> SessionError {
    if source.is_timeout() {
        SessionError::Timeout(step)
    } else {
        SessionError::Transport { step, source }
    }
}

fn select<'a>(document: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn link_href(html: &str, text: &str) -> Option<String> {
    let document = Html::parse_document(html);
    select(&document, "a[href]")
        .into_iter()
        .find(|a| a.text().collect::<String>().trim() == text)
        .and_then(|a| a.value().attr("href").map(str::to_string))
}

fn has_input(html: &str, name: &str, value: &str) -> bool {
    let document = Html::parse_document(html);
    select(&document, "input").into_iter().any(|input| {
        input.value().attr("name") == Some(name) && input.value().attr("value") == Some(value)
    })
}

/// Named inputs of the page with their current values. Unchecked radios and
/// checkboxes and submit buttons are left out.
fn form_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    select(&document, "input[name], select[name]")
        .into_iter()
        .filter_map(|element| {
            let el = element.value();
            let name = el.attr("name")?.to_string();
            if el.name() == "select" {
                let selected = element
                    .children()
                    .filter_map(scraper::ElementRef::wrap)
                    .find(|option| option.value().attr("selected").is_some())
                    .and_then(|option| option.value().attr("value"))
                    .unwrap_or_default();
                return Some((name, selected.to_string()));
            }
            match el.attr("type").unwrap_or("text") {
                "submit" | "button" | "image" => None,
                "radio" | "checkbox" if el.attr("checked").is_none() => None,
                _ => Some((name, el.attr("value").unwrap_or_default().to_string())),
            }
        })
        .collect()
}

fn is_login_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    select(&document, "input[name='cusername']").into_iter().next().is_some()
}
