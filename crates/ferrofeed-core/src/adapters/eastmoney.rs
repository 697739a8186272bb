use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{fetch_body, strip_jsonp};
use crate::data_source::{
    NewsQuery, NewsSource, PriceQuery, PriceSource, RawRow, SourceError, SourceFuture,
};
use crate::domain::compact_date;
use crate::http_client::{HttpClient, HttpRequest};
use crate::{AssetClass, Symbol};

const PROVIDER: &str = "eastmoney";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const NEWS_URL: &str = "https://search-api-web.eastmoney.com/search/jsonp";
const ARTICLE_URL: &str = "http://finance.eastmoney.com/a/";
const NEWS_PAGE_SIZE: usize = 100;

/// Column labels of a kline CSV line, in field order `f51..f61`.
const KLINE_LABELS: [&str; 11] = [
    "日期", "开盘", "收盘", "最高", "最低", "成交量", "成交额", "振幅", "涨跌幅", "涨跌额", "换手率",
];

/// Domestic equity daily klines (forward-adjusted) and company news.
#[derive(Clone)]
pub struct EastmoneyAdapter {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl EastmoneyAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            http_client,
            timeout_ms,
        }
    }

    /// Exchange-prefixed security id: Shanghai codes start with 6.
    fn secid(symbol: &Symbol) -> String {
        let market = if symbol.as_str().starts_with('6') { 1 } else { 0 };
        format!("{market}.{symbol}")
    }

    fn kline_request(&self, query: &PriceQuery) -> HttpRequest {
        let begin = query
            .start
            .map(compact_date)
            .unwrap_or_else(|| String::from("19700101"));

        HttpRequest::get(KLINE_URL)
            .with_query("fields1", "f1,f2,f3,f4,f5,f6")
            .with_query("fields2", "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61")
            .with_query("ut", "7eea3edcaed734bea9cbfc24409ed989")
            .with_query("klt", "101")
            .with_query("fqt", "1")
            .with_query("secid", Self::secid(&query.symbol))
            .with_query("beg", begin)
            .with_query("end", compact_date(query.end))
            .with_timeout_ms(self.timeout_ms)
    }

    fn news_request(&self, query: &NewsQuery) -> HttpRequest {
        let param = json!({
            "uid": "",
            "keyword": query.symbol.as_str(),
            "type": ["cmsArticleWebOld"],
            "client": "web",
            "clientType": "web",
            "clientVersion": "curr",
            "param": {
                "cmsArticleWebOld": {
                    "searchScope": "default",
                    "sort": "default",
                    "pageIndex": 1,
                    "pageSize": NEWS_PAGE_SIZE,
                    "preTag": "<em>",
                    "postTag": "</em>"
                }
            }
        });

        HttpRequest::get(NEWS_URL)
            .with_query("cb", "jQuery_ferrofeed")
            .with_query("param", param.to_string())
            .with_header("referer", "https://so.eastmoney.com/")
            .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch_klines(&self, query: &PriceQuery) -> Result<Vec<RawRow>, SourceError> {
        let body = fetch_body(self.http_client.as_ref(), PROVIDER, self.kline_request(query)).await?;
        parse_klines(&body)
    }

    async fn fetch_articles(&self, query: &NewsQuery) -> Result<Vec<RawRow>, SourceError> {
        let body = fetch_body(self.http_client.as_ref(), PROVIDER, self.news_request(query)).await?;
        parse_articles(&query.symbol, &body)
    }
}

impl PriceSource for EastmoneyAdapter {
    fn asset_class(&self) -> AssetClass {
        AssetClass::EquityDomestic
    }

    fn fetch_prices<'a>(&'a self, query: &'a PriceQuery) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.fetch_klines(query))
    }
}

impl NewsSource for EastmoneyAdapter {
    fn asset_class(&self) -> AssetClass {
        AssetClass::EquityDomestic
    }

    fn fetch_news<'a>(&'a self, query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.fetch_articles(query))
    }
}

#[derive(Debug, Deserialize)]
struct KlineEnvelope {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

fn parse_klines(body: &str) -> Result<Vec<RawRow>, SourceError> {
    let envelope: KlineEnvelope = serde_json::from_str(body)
        .map_err(|e| SourceError::decode(format!("failed to parse eastmoney klines: {e}")))?;
    let Some(data) = envelope.data else {
        return Ok(Vec::new());
    };

    Ok(data
        .klines
        .iter()
        .map(|line| {
            KLINE_LABELS
                .iter()
                .zip(line.split(','))
                .map(|(label, cell)| ((*label).to_owned(), Value::String(cell.trim().to_owned())))
                .collect::<RawRow>()
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default, rename = "cmsArticleWebOld")]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default, rename = "mediaName")]
    media_name: String,
    #[serde(default)]
    code: String,
}

fn parse_articles(symbol: &Symbol, body: &str) -> Result<Vec<RawRow>, SourceError> {
    let payload = strip_jsonp(body)
        .ok_or_else(|| SourceError::decode("eastmoney news response is not JSONP"))?;
    let envelope: SearchEnvelope = serde_json::from_str(payload)
        .map_err(|e| SourceError::decode(format!("failed to parse eastmoney news: {e}")))?;
    let articles = envelope.result.map(|result| result.articles).unwrap_or_default();

    Ok(articles
        .into_iter()
        .map(|article| {
            let mut row = RawRow::new();
            row.insert("关键词".into(), Value::String(symbol.to_string()));
            row.insert("新闻标题".into(), Value::String(clean_text(&article.title)));
            row.insert("新闻内容".into(), Value::String(clean_text(&article.content)));
            row.insert("发布时间".into(), Value::String(article.date));
            row.insert("文章来源".into(), Value::String(article.media_name));
            row.insert(
                "新闻链接".into(),
                Value::String(format!("{ARTICLE_URL}{}.html", article.code)),
            );
            row
        })
        .collect())
}

/// Drop search highlight tags and layout whitespace.
fn clean_text(text: &str) -> String {
    text.replace("<em>", "")
        .replace("</em>", "")
        .replace(['\u{3000}', '\r', '\n'], " ")
        .trim()
        .to_owned()
}
