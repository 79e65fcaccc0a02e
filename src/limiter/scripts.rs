//! Server-side scripts. Both state machines are single atomic scripts so
//! that every worker process coordinates through the same store without
//! client-side locking; plain GET/SET round-trips cannot provide that.

/// KEYS[1] bucket key; ARGV capacity, refill/s, now (seconds, fractional),
/// requested. Returns {allowed 0|1, tokens_left as string}.
pub const TOKEN_BUCKET_LUA: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local requested = tonumber(ARGV[4])

local data = redis.call("HMGET", key, "tokens", "last")
local tokens = tonumber(data[1])
local last = tonumber(data[2])
if tokens == nil or last == nil then
    tokens = capacity
    last = now
end

local elapsed = now - last
if elapsed < 0 then
    elapsed = 0
end
tokens = math.min(capacity, tokens + elapsed * refill)

local allowed = 0
if tokens >= requested then
    tokens = tokens - requested
    allowed = 1
end

redis.call("HMSET", key, "tokens", tokens, "last", now)
redis.call("EXPIRE", key, 3600)
return {allowed, tostring(tokens)}
"#;

/// KEYS[1] breaker key; ARGV window, threshold, open_for, now (integer
/// seconds), op in {"inc", "is_open", "clear"}.
/// Returns {is_open 0|1, count, opened_until}.
pub const CIRCUIT_BREAKER_LUA: &str = r#"
local key = KEYS[1]
local window = tonumber(ARGV[1])
local threshold = tonumber(ARGV[2])
local open_for = tonumber(ARGV[3])
local now = tonumber(ARGV[4])
local op = ARGV[5]

if op == "inc" then
    local count = redis.call("INCR", key .. ":count")
    redis.call("EXPIRE", key .. ":count", window)
    local opened = tonumber(redis.call("GET", key .. ":until") or "0")
    if count >= threshold then
        opened = now + open_for
        redis.call("SET", key .. ":until", opened, "EX", open_for)
    end
    local is_open = 0
    if opened > now then
        is_open = 1
    end
    return {is_open, count, opened}
elseif op == "is_open" then
    local opened = tonumber(redis.call("GET", key .. ":until") or "0")
    local count = tonumber(redis.call("GET", key .. ":count") or "0")
    local is_open = 0
    if opened > now then
        is_open = 1
    end
    return {is_open, count, opened}
else
    redis.call("DEL", key .. ":count", key .. ":until")
    return {0, 0, 0}
end
"#;
